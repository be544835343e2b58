//! Read-only SQL facade over the gold layer
//!
//! The gold CSV is loaded into an in-memory SQLite table `gold_view`, then
//! the connection is switched to `query_only`. Monetary results are rounded
//! to 2 decimal places here, at presentation time, via `printf('%.2f', ...)`.

use crate::error::{EtlError, EtlResult, QueryError};
use crate::model::CustomerMetric;
use crate::storage::read_csv;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;

/// Gold row as presented to callers (money rounded to cents)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCustomer {
    pub customer_id: String,
    pub total_spend: Decimal,
    pub transaction_count: i64,
    pub avg_transaction_amount: Decimal,
}

/// Column a segmentation buckets on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentField {
    TransactionCount,
    TotalSpend,
}

impl SegmentField {
    fn column(&self) -> &'static str {
        match self {
            SegmentField::TransactionCount => "transaction_count",
            SegmentField::TotalSpend => "total_spend",
        }
    }
}

/// One bucket `[lower, upper)`; `None` bounds are open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub label: String,
    pub lower: Option<Decimal>,
    pub upper: Option<Decimal>,
    pub customers: i64,
    pub total_spend: Decimal,
}

/// Quartiles of `total_spend` and customer counts per quartile band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendDistribution {
    pub q1: Decimal,
    pub median: Decimal,
    pub q3: Decimal,
    pub low: usize,
    pub mid_low: usize,
    pub mid_high: usize,
    pub high: usize,
}

/// Aggregate-of-aggregates across all customers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldSummary {
    pub total_customers: i64,
    pub total_transactions: i64,
    pub total_revenue: Decimal,
    pub avg_customer_value: Decimal,
    pub avg_transactions: Decimal,
    pub avg_transaction_amount: Decimal,
    pub min_spend: Decimal,
    pub max_spend: Decimal,
}

/// Completeness figures for the loaded gold table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuality {
    pub total_records: i64,
    pub missing_values: i64,
    pub duplicate_customers: i64,
    pub columns: Vec<String>,
}

pub struct GoldQuery {
    conn: Connection,
    rows: usize,
}

impl GoldQuery {
    /// Load a gold CSV file
    ///
    /// A missing file is `QueryError::TableMissing`.
    pub fn open(gold_path: impl AsRef<Path>, delimiter: u8) -> EtlResult<Self> {
        let gold_path = gold_path.as_ref();
        if !gold_path.exists() {
            return Err(QueryError::TableMissing(gold_path.to_path_buf()).into());
        }

        let metrics: Vec<CustomerMetric> = read_csv(gold_path, delimiter)?;
        let query = Self::from_metrics(&metrics).map_err(EtlError::from)?;

        log::info!("🔎 Gold view loaded: {} rows from {}", query.rows, gold_path.display());
        Ok(query)
    }

    pub fn from_metrics(metrics: &[CustomerMetric]) -> Result<Self, QueryError> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE gold_view (
                customer_id TEXT NOT NULL,
                total_spend REAL NOT NULL,
                transaction_count INTEGER NOT NULL,
                avg_transaction_amount REAL NOT NULL
            )",
        )?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gold_view (customer_id, total_spend, transaction_count, avg_transaction_amount)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for metric in metrics {
                let count = i64::try_from(metric.transaction_count).map_err(|_| {
                    QueryError::InvalidRow(format!("transaction_count out of range for '{}'", metric.customer_id))
                })?;
                stmt.execute(params![
                    metric.customer_id,
                    as_real(metric.total_spend, &metric.customer_id)?,
                    count,
                    as_real(metric.avg_transaction_amount, &metric.customer_id)?,
                ])?;
            }
        }
        tx.commit()?;

        conn.execute_batch("PRAGMA query_only = ON")?;

        Ok(Self {
            conn,
            rows: metrics.len(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Top `n` customers by total spend; ties broken by `customer_id`
    pub fn top_by_spend(&self, n: usize) -> Result<Vec<RankedCustomer>, QueryError> {
        self.ranked(
            "ORDER BY total_spend DESC, customer_id ASC LIMIT ?1",
            params![limit(n)],
        )
    }

    /// Top `n` customers by transaction count, then spend
    pub fn top_by_transaction_count(&self, n: usize) -> Result<Vec<RankedCustomer>, QueryError> {
        self.ranked(
            "ORDER BY transaction_count DESC, total_spend DESC, customer_id ASC LIMIT ?1",
            params![limit(n)],
        )
    }

    /// Customers whose total spend is strictly greater than `threshold`
    pub fn spend_above(&self, threshold: Decimal) -> Result<Vec<RankedCustomer>, QueryError> {
        let threshold = threshold
            .to_f64()
            .ok_or_else(|| QueryError::InvalidArgument(format!("threshold {} not representable", threshold)))?;

        self.ranked(
            "WHERE total_spend > ?1 ORDER BY total_spend DESC, customer_id ASC",
            params![threshold],
        )
    }

    /// Bucket customers on `field` using strictly ascending `boundaries`
    ///
    /// `n` boundaries produce `n + 1` buckets: `< b0`, `[b0, b1)`, ..., `>= bn`.
    pub fn segment(&self, field: SegmentField, boundaries: &[Decimal]) -> Result<Vec<Segment>, QueryError> {
        if boundaries.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(QueryError::InvalidArgument(
                "segment boundaries must be strictly ascending".to_string(),
            ));
        }

        let sql = format!(
            "SELECT COUNT(*), printf('%.2f', COALESCE(SUM(total_spend), 0))
             FROM gold_view
             WHERE (?1 IS NULL OR {col} >= ?1) AND (?2 IS NULL OR {col} < ?2)",
            col = field.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let mut bounds: Vec<Option<Decimal>> = Vec::with_capacity(boundaries.len() + 2);
        bounds.push(None);
        bounds.extend(boundaries.iter().copied().map(Some));
        bounds.push(None);

        let mut segments = Vec::with_capacity(bounds.len() - 1);
        for pair in bounds.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let (customers, total_spend) = stmt.query_row(
                params![optional_real(lower)?, optional_real(upper)?],
                |row| Ok((row.get::<_, i64>(0)?, money(row, 1)?)),
            )?;

            segments.push(Segment {
                label: segment_label(lower, upper),
                lower,
                upper,
                customers,
                total_spend,
            });
        }

        Ok(segments)
    }

    /// Quartiles by linear interpolation and the customer count in each band
    pub fn spend_distribution(&self) -> Result<SpendDistribution, QueryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT total_spend FROM gold_view ORDER BY total_spend ASC")?;
        let spends = stmt
            .query_map([], |row| row.get::<_, f64>(0))?
            .collect::<Result<Vec<f64>, _>>()?;

        if spends.is_empty() {
            return Err(QueryError::EmptyTable("spend_distribution"));
        }

        let q1 = quantile(&spends, 0.25);
        let median = quantile(&spends, 0.5);
        let q3 = quantile(&spends, 0.75);

        Ok(SpendDistribution {
            q1: cents(q1)?,
            median: cents(median)?,
            q3: cents(q3)?,
            low: spends.iter().filter(|s| **s < q1).count(),
            mid_low: spends.iter().filter(|s| **s >= q1 && **s < median).count(),
            mid_high: spends.iter().filter(|s| **s >= median && **s < q3).count(),
            high: spends.iter().filter(|s| **s >= q3).count(),
        })
    }

    /// Totals and averages across every gold row
    pub fn summary(&self) -> Result<GoldSummary, QueryError> {
        if self.rows == 0 {
            return Err(QueryError::EmptyTable("summary"));
        }

        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    SUM(transaction_count),
                    printf('%.2f', SUM(total_spend)),
                    printf('%.2f', AVG(total_spend)),
                    printf('%.2f', AVG(transaction_count)),
                    printf('%.2f', SUM(total_spend) / SUM(transaction_count)),
                    printf('%.2f', MIN(total_spend)),
                    printf('%.2f', MAX(total_spend))
             FROM gold_view",
            [],
            |row| {
                Ok(GoldSummary {
                    total_customers: row.get(0)?,
                    total_transactions: row.get(1)?,
                    total_revenue: money(row, 2)?,
                    avg_customer_value: money(row, 3)?,
                    avg_transactions: money(row, 4)?,
                    avg_transaction_amount: money(row, 5)?,
                    min_spend: money(row, 6)?,
                    max_spend: money(row, 7)?,
                })
            },
        )?;

        Ok(summary)
    }

    /// Row count, nulls across every column, repeated customer ids and the column list
    pub fn data_quality(&self) -> Result<DataQuality, QueryError> {
        let (total_records, missing_values, duplicate_customers) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM((customer_id IS NULL) + (total_spend IS NULL)
                        + (transaction_count IS NULL) + (avg_transaction_amount IS NULL)), 0),
                    COUNT(*) - COUNT(DISTINCT customer_id)
             FROM gold_view",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
        )?;

        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info('gold_view') ORDER BY cid")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DataQuality {
            total_records,
            missing_values,
            duplicate_customers,
            columns,
        })
    }

    fn ranked<P: rusqlite::Params>(&self, tail: &str, params: P) -> Result<Vec<RankedCustomer>, QueryError> {
        let sql = format!(
            "SELECT customer_id,
                    printf('%.2f', total_spend),
                    transaction_count,
                    printf('%.2f', avg_transaction_amount)
             FROM gold_view {}",
            tail
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(RankedCustomer {
                customer_id: row.get(0)?,
                total_spend: money(row, 1)?,
                transaction_count: row.get(2)?,
                avg_transaction_amount: money(row, 3)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn as_real(value: Decimal, customer_id: &str) -> Result<f64, QueryError> {
    value
        .to_f64()
        .ok_or_else(|| QueryError::InvalidRow(format!("value {} for '{}' not representable", value, customer_id)))
}

fn optional_real(value: Option<Decimal>) -> Result<Option<f64>, QueryError> {
    value
        .map(|v| {
            v.to_f64()
                .ok_or_else(|| QueryError::InvalidArgument(format!("boundary {} not representable", v)))
        })
        .transpose()
}

/// Read a `printf('%.2f', ...)` column as a decimal
fn money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn cents(value: f64) -> Result<Decimal, QueryError> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(2))
        .map_err(|e| QueryError::InvalidRow(format!("quantile {} not representable: {}", value, e)))
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn segment_label(lower: Option<Decimal>, upper: Option<Decimal>) -> String {
    match (lower, upper) {
        (None, None) => "all".to_string(),
        (None, Some(upper)) => format!("< {}", upper),
        (Some(lower), None) => format!(">= {}", lower),
        (Some(lower), Some(upper)) => format!("{} - {}", lower, upper),
    }
}
