//! Batch pipeline: raw -> silver -> gold -> metadata
//!
//! ```text
//! raw/customers.csv ──┐
//!                     ├─ Cleaner ─ silver/*.csv ─ Aggregator ─ gold/gold_view.csv
//! raw/transactions.csv┘                                     └─ metadata.json
//! ```
//!
//! Both raw tables are loaded, schema-checked and transformed before anything
//! is written. Silver, gold and metadata are then staged and renamed into
//! place in one commit. A fatal error before the commit leaves the previous
//! outputs untouched.
//!
//! There is no locking: two concurrent runs against one data directory both
//! complete, and the last rename of each file wins.

use crate::aggregator::{build_gold_view, GoldView};
use crate::cleaner::{clean_customers, clean_transactions, Cleaned, DataQualityWarning};
use crate::config::PipelineConfig;
use crate::error::EtlResult;
use crate::metadata::{gold_metric_definitions, MetadataWriter};
use crate::model::{Customer, Transaction};
use crate::schema;
use crate::storage::Staging;
use crate::table::RawTable;
use rust_decimal::Decimal;
use std::time::Instant;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub customers_raw: usize,
    pub customers_silver: usize,
    pub transactions_raw: usize,
    pub transactions_silver: usize,
    pub gold_rows: usize,
    pub orphan_transactions: usize,
    pub customers_without_spend: usize,
    /// Σ amount over silver transactions, equal to Σ gold total_spend
    pub total_spend: Decimal,
    pub warnings: Vec<DataQualityWarning>,
}

/// Silver and gold in memory, before anything is written
#[derive(Debug, Clone)]
pub struct Transformed {
    pub customers: Cleaned<Customer>,
    pub transactions: Cleaned<Transaction>,
    pub gold: GoldView,
}

impl Transformed {
    pub fn report(&self) -> PipelineReport {
        let mut warnings = self.customers.warnings();
        warnings.extend(self.transactions.warnings());

        PipelineReport {
            customers_raw: self.customers.input_rows,
            customers_silver: self.customers.rows.len(),
            transactions_raw: self.transactions.input_rows,
            transactions_silver: self.transactions.rows.len(),
            gold_rows: self.gold.metrics.len(),
            orphan_transactions: self.gold.orphan_transactions,
            customers_without_spend: self.gold.customers_without_spend,
            total_spend: self.gold.metrics.iter().map(|m| m.total_spend).sum(),
            warnings,
        }
    }
}

/// Pure transform from raw tables to silver and gold
pub fn transform(customers: &RawTable, transactions: &RawTable) -> EtlResult<Transformed> {
    let customers = clean_customers(customers)?;
    let transactions = clean_transactions(transactions)?;
    let gold = build_gold_view(&customers.rows, &transactions.rows)?;

    Ok(Transformed {
        customers,
        transactions,
        gold,
    })
}

/// Run the full pipeline against the configured data directory
pub fn run(config: &PipelineConfig) -> EtlResult<PipelineReport> {
    let started = Instant::now();
    log::info!("🚀 Starting ETL pipeline");
    log::info!("   └─ Data directory: {}", config.data_dir.display());

    // Extract: both inputs must exist and parse before any transform
    let customers_raw = RawTable::load(schema::CUSTOMERS.name, config.customers_raw_path(), config.delimiter)?;
    let transactions_raw = RawTable::load(
        schema::TRANSACTIONS.name,
        config.transactions_raw_path(),
        config.delimiter,
    )?;

    let transformed = transform(&customers_raw, &transactions_raw)?;

    // Load: stage every layer file and the sidecar, then publish together
    let mut staging = Staging::new(config.delimiter);
    staging.stage_csv(
        config.customers_silver_path(),
        schema::CUSTOMERS_SILVER.columns,
        &transformed.customers.rows,
    )?;
    staging.stage_csv(
        config.transactions_silver_path(),
        schema::TRANSACTIONS_SILVER.columns,
        &transformed.transactions.rows,
    )?;
    staging.stage_csv(config.gold_path(), schema::GOLD_VIEW.columns, &transformed.gold.metrics)?;

    let mut metadata = MetadataWriter::new(config.metadata_path());
    metadata
        .record(
            schema::CUSTOMERS_SILVER.name,
            schema::CUSTOMERS_SILVER.columns,
            transformed.customers.rows.len(),
        )
        .record(
            schema::TRANSACTIONS_SILVER.name,
            schema::TRANSACTIONS_SILVER.columns,
            transformed.transactions.rows.len(),
        )
        .record_with_metrics(
            schema::GOLD_VIEW.name,
            schema::GOLD_VIEW.columns,
            transformed.gold.metrics.len(),
            gold_metric_definitions(),
        );
    metadata.stage(&mut staging)?;
    staging.commit()?;

    let report = transformed.report();
    log::info!(
        "✅ ETL pipeline completed in {:.2?}: {} silver customers, {} silver transactions, {} gold rows",
        started.elapsed(),
        report.customers_silver,
        report.transactions_silver,
        report.gold_rows
    );

    Ok(report)
}
