//! Post-run data quality checks over the silver and gold layers
//!
//! Every check records a PASS/FAIL result instead of returning early, so one
//! run reports everything that is wrong.

use crate::aggregator::aggregate;
use crate::config::PipelineConfig;
use crate::model::{CustomerMetric, Transaction};
use crate::schema::{self, check_key, count_violations, TableSchema};
use crate::storage::read_csv;
use crate::table::RawTable;
use rust_decimal::Decimal;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub check: String,
    pub status: CheckStatus,
    pub message: String,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.symbol(), self.check, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub results: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == CheckStatus::Pass)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.status == CheckStatus::Fail)
    }
}

/// Lower bound applied to a numeric column
struct RangeRule {
    column: &'static str,
    min: Decimal,
    inclusive: bool,
}

impl RangeRule {
    const fn positive(column: &'static str) -> Self {
        Self {
            column,
            min: Decimal::ZERO,
            inclusive: false,
        }
    }

    const fn at_least(column: &'static str, min: Decimal) -> Self {
        Self {
            column,
            min,
            inclusive: true,
        }
    }

    fn holds(&self, value: Decimal) -> bool {
        if self.inclusive {
            value >= self.min
        } else {
            value > self.min
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", if self.inclusive { ">=" } else { ">" }, self.min)
    }
}

// Same floors the cleaner and aggregator guarantee: amounts strictly positive
const SILVER_TRANSACTION_RANGES: &[RangeRule] = &[RangeRule::positive("amount")];

const GOLD_RANGES: &[RangeRule] = &[
    RangeRule::positive("total_spend"),
    RangeRule::at_least("transaction_count", Decimal::ONE),
    RangeRule::positive("avg_transaction_amount"),
];

pub struct DataValidator {
    config: PipelineConfig,
    report: ValidationReport,
}

impl DataValidator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            report: ValidationReport::default(),
        }
    }

    /// Run every silver, gold and cross-layer check
    pub fn validate_all(mut self) -> ValidationReport {
        log::info!("📋 Silver layer checks");
        self.validate_table(&self.config.customers_silver_path(), &schema::CUSTOMERS_SILVER, &[]);
        self.validate_table(
            &self.config.transactions_silver_path(),
            &schema::TRANSACTIONS_SILVER,
            SILVER_TRANSACTION_RANGES,
        );

        log::info!("💰 Gold layer checks");
        self.validate_table(&self.config.gold_path(), &schema::GOLD_VIEW, GOLD_RANGES);

        log::info!("🔗 Cross-layer checks");
        self.validate_gold_aggregations();

        log::info!(
            "Validation finished: {} passed, {} failed out of {} checks",
            self.report.passed(),
            self.report.failed(),
            self.report.total()
        );
        self.report
    }

    fn record(&mut self, check: String, passed: bool, message: String) {
        let result = CheckResult {
            check,
            status: if passed { CheckStatus::Pass } else { CheckStatus::Fail },
            message,
        };
        log::debug!("{}", result);
        self.report.results.push(result);
    }

    fn validate_table(&mut self, path: &Path, contract: &TableSchema, ranges: &[RangeRule]) {
        let label = self.config.display_path(path).display().to_string();

        if !self.validate_file_exists(path, &label) {
            return;
        }

        let table = match RawTable::load(contract.name, path, self.config.delimiter) {
            Ok(table) => table,
            Err(e) => {
                self.record(format!("CSV structure: {}", label), false, e.to_string());
                return;
            }
        };

        let indices = match table.require(contract.columns) {
            Ok(indices) => {
                self.record(
                    format!("CSV structure: {}", label),
                    true,
                    format!("{} rows, {} columns", table.len(), table.headers().len()),
                );
                indices
            }
            Err(e) => {
                self.record(
                    format!("CSV structure: {}", label),
                    false,
                    format!("Missing columns: {}", e.missing.join(", ")),
                );
                return;
            }
        };

        let null_columns: Vec<String> = contract
            .columns
            .iter()
            .zip(&indices)
            .filter_map(|(column, &idx)| {
                let nulls = table.column(idx).filter(Option::is_none).count();
                (nulls > 0).then(|| format!("{}={}", column, nulls))
            })
            .collect();
        if null_columns.is_empty() {
            self.record(format!("No nulls: {}", label), true, "All critical columns populated".to_string());
        } else {
            self.record(
                format!("No nulls: {}", label),
                false,
                format!("Found nulls: {}", null_columns.join(", ")),
            );
        }

        if let Some(key_idx) = table.column_index(contract.key) {
            let key = check_key(table.column(key_idx));
            self.record(
                format!("Unique key: {}.{}", label, contract.key),
                key.is_clean(),
                format!("{} null, {} duplicate", key.nulls, key.duplicates),
            );
        }

        for rule in ranges {
            let Some(idx) = table.column_index(rule.column) else {
                continue;
            };
            let violations = count_violations(table.column(idx), |value| rule.holds(value));
            self.record(
                format!("Numeric range: {}.{}", label, rule.column),
                violations == 0,
                if violations == 0 {
                    format!("All values {}", rule.describe())
                } else {
                    format!("Found {} value(s) not {}", violations, rule.describe())
                },
            );
        }
    }

    fn validate_file_exists(&mut self, path: &Path, label: &str) -> bool {
        match path.metadata() {
            Ok(meta) => {
                self.record(format!("File exists: {}", label), true, format!("Size: {} bytes", meta.len()));
                true
            }
            Err(_) => {
                self.record(format!("File exists: {}", label), false, "File not found".to_string());
                false
            }
        }
    }

    /// Recompute gold from silver and compare row by row, exactly
    fn validate_gold_aggregations(&mut self) {
        let silver_path = self.config.transactions_silver_path();
        let gold_path = self.config.gold_path();

        if !(silver_path.exists() && gold_path.exists()) {
            self.record("Gold aggregations".to_string(), false, "Missing silver or gold files".to_string());
            return;
        }

        let loaded = read_csv::<Transaction>(&silver_path, self.config.delimiter).and_then(|silver| {
            read_csv::<CustomerMetric>(&gold_path, self.config.delimiter).map(|gold| (silver, gold))
        });
        let (silver, mut gold) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.record("Gold aggregations".to_string(), false, e.to_string());
                return;
            }
        };

        let silver_total: Decimal = silver.iter().map(|t| t.amount).sum();
        let gold_total: Decimal = gold.iter().map(|m| m.total_spend).sum();
        self.record(
            "Spend conservation".to_string(),
            silver_total == gold_total,
            format!("silver Σamount={} gold Σtotal_spend={}", silver_total, gold_total),
        );

        let inexact = gold
            .iter()
            .filter(|m| {
                m.transaction_count == 0
                    || m.avg_transaction_amount != m.total_spend / Decimal::from(m.transaction_count)
            })
            .count();
        self.record(
            "Average consistency".to_string(),
            inexact == 0,
            if inexact == 0 {
                "avg_transaction_amount == total_spend / transaction_count for every row".to_string()
            } else {
                format!("{} row(s) with inconsistent averages", inexact)
            },
        );

        let expected = match aggregate(&silver) {
            Ok(expected) => expected,
            Err(e) => {
                self.record("Gold aggregations".to_string(), false, e.to_string());
                return;
            }
        };
        gold.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));

        let expected_ids: Vec<&str> = expected.iter().map(|m| m.customer_id.as_str()).collect();
        let gold_ids: Vec<&str> = gold.iter().map(|m| m.customer_id.as_str()).collect();
        if expected_ids != gold_ids {
            self.record(
                "Gold aggregations".to_string(),
                false,
                format!(
                    "Customer IDs don't match ({} expected, {} in gold)",
                    expected_ids.len(),
                    gold_ids.len()
                ),
            );
            return;
        }

        let mismatched: Vec<&str> = expected
            .iter()
            .zip(&gold)
            .filter(|(want, got)| {
                want.total_spend != got.total_spend || want.transaction_count != got.transaction_count
            })
            .map(|(want, _)| want.customer_id.as_str())
            .collect();

        if mismatched.is_empty() {
            self.record("Gold aggregations".to_string(), true, "Gold view matches silver data".to_string());
        } else {
            self.record(
                "Gold aggregations".to_string(),
                false,
                format!("Metrics differ for: {}", mismatched.join(", ")),
            );
        }
    }
}
