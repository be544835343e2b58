//! Raw -> Silver cleaning
//!
//! Order of operations per table:
//! 1. drop rows with a null in any required column
//! 2. deduplicate on the primary key, first occurrence wins
//! 3. transactions only: drop unparseable or non-positive amounts
//!
//! Only the recognized columns survive. Dropped rows are counted, never fatal.

use crate::error::SchemaError;
use crate::model::{Customer, Transaction};
use crate::schema::{self, parse_decimal, TableSchema};
use crate::table::RawTable;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;

/// Rows removed at each cleaning step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub null_required: usize,
    pub duplicate_key: usize,
    pub invalid_amount: usize,
    pub non_positive_amount: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.null_required + self.duplicate_key + self.invalid_amount + self.non_positive_amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NullRequired,
    DuplicateKey,
    InvalidAmount,
    NonPositiveAmount,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NullRequired => "null in required column",
            DropReason::DuplicateKey => "duplicate key",
            DropReason::InvalidAmount => "unparseable amount",
            DropReason::NonPositiveAmount => "non-positive amount",
        }
    }
}

/// Non-fatal data quality finding: rows dropped from one table for one reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQualityWarning {
    pub table: &'static str,
    pub reason: DropReason,
    pub rows: usize,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: dropped {} row(s) ({})", self.table, self.rows, self.reason.as_str())
    }
}

/// Output of cleaning one table
#[derive(Debug, Clone)]
pub struct Cleaned<T> {
    pub table: &'static str,
    pub input_rows: usize,
    pub rows: Vec<T>,
    pub dropped: DropCounts,
}

impl<T> Cleaned<T> {
    pub fn warnings(&self) -> Vec<DataQualityWarning> {
        let counts = [
            (DropReason::NullRequired, self.dropped.null_required),
            (DropReason::DuplicateKey, self.dropped.duplicate_key),
            (DropReason::InvalidAmount, self.dropped.invalid_amount),
            (DropReason::NonPositiveAmount, self.dropped.non_positive_amount),
        ];

        counts
            .into_iter()
            .filter(|(_, rows)| *rows > 0)
            .map(|(reason, rows)| DataQualityWarning {
                table: self.table,
                reason,
                rows,
            })
            .collect()
    }

    fn log_summary(&self) {
        log::info!(
            "🧹 {} cleaned: {} -> {} rows ({} dropped)",
            self.table,
            self.input_rows,
            self.rows.len(),
            self.dropped.total()
        );
        for warning in self.warnings() {
            log::warn!("⚠️  {}", warning);
        }
    }
}

/// Steps 1 and 2, shared by both tables
///
/// Returns the surviving rows' required cells in schema column order.
fn drop_nulls_and_duplicates<'a>(
    raw: &'a RawTable,
    contract: &TableSchema,
    dropped: &mut DropCounts,
) -> Result<Vec<Vec<&'a str>>, SchemaError> {
    let indices = raw.require(contract.columns).map_err(|e| SchemaError {
        table: contract.name.to_string(),
        ..e
    })?;
    let key_pos = contract
        .columns
        .iter()
        .position(|c| *c == contract.key)
        .unwrap_or(0);

    let mut complete = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let cells: Option<Vec<&str>> = indices
            .iter()
            .map(|&idx| row.get(idx).and_then(|cell| cell.as_deref()))
            .collect();

        match cells {
            Some(cells) => complete.push(cells),
            None => dropped.null_required += 1,
        }
    }

    let mut seen = HashSet::with_capacity(complete.len());
    let mut unique = Vec::with_capacity(complete.len());
    for cells in complete {
        if seen.insert(cells[key_pos]) {
            unique.push(cells);
        } else {
            log::debug!("Duplicate {} key '{}' dropped", contract.name, cells[key_pos]);
            dropped.duplicate_key += 1;
        }
    }

    Ok(unique)
}

/// Clean raw customers into silver `Customer` rows
pub fn clean_customers(raw: &RawTable) -> Result<Cleaned<Customer>, SchemaError> {
    let mut dropped = DropCounts::default();
    let rows = drop_nulls_and_duplicates(raw, &schema::CUSTOMERS, &mut dropped)?
        .into_iter()
        .map(|cells| Customer {
            customer_id: cells[0].to_string(),
            email: cells[1].to_string(),
        })
        .collect();

    let cleaned = Cleaned {
        table: schema::CUSTOMERS.name,
        input_rows: raw.len(),
        rows,
        dropped,
    };
    cleaned.log_summary();
    Ok(cleaned)
}

/// Clean raw transactions into silver `Transaction` rows
pub fn clean_transactions(raw: &RawTable) -> Result<Cleaned<Transaction>, SchemaError> {
    let mut dropped = DropCounts::default();
    let mut rows = Vec::new();

    for cells in drop_nulls_and_duplicates(raw, &schema::TRANSACTIONS, &mut dropped)? {
        let amount = match parse_decimal(cells[2]) {
            Some(amount) => amount,
            None => {
                log::debug!("Transaction '{}' has unparseable amount '{}'", cells[0], cells[2]);
                dropped.invalid_amount += 1;
                continue;
            }
        };

        if amount <= Decimal::ZERO {
            dropped.non_positive_amount += 1;
            continue;
        }

        rows.push(Transaction {
            transaction_id: cells[0].to_string(),
            customer_id: cells[1].to_string(),
            amount,
        });
    }

    let cleaned = Cleaned {
        table: schema::TRANSACTIONS.name,
        input_rows: raw.len(),
        rows,
        dropped,
    };
    cleaned.log_summary();
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transactions(rows: Vec<[Option<&str>; 3]>) -> RawTable {
        RawTable::from_rows(
            "transactions",
            &["transaction_id", "customer_id", "amount"],
            rows.into_iter().map(|r| r.to_vec()).collect(),
        )
    }

    #[test]
    fn test_drops_negative_amounts() {
        let raw = transactions(vec![
            [Some("t_001"), Some("c_001"), Some("100.00")],
            [Some("t_002"), Some("c_001"), Some("50.50")],
            [Some("t_003"), Some("c_002"), Some("150.00")],
            [Some("t_004"), Some("c_003"), Some("-50.00")],
        ]);

        let cleaned = clean_transactions(&raw).unwrap();

        assert_eq!(cleaned.rows.len(), 3);
        assert!(cleaned.rows.iter().all(|t| t.customer_id != "c_003"));
        assert_eq!(cleaned.dropped.non_positive_amount, 1);
        assert_eq!(cleaned.warnings().len(), 1);
    }

    #[test]
    fn test_duplicate_transaction_keeps_first() {
        let raw = transactions(vec![
            [Some("t_001"), Some("c_001"), Some("100.00")],
            [Some("t_001"), Some("c_001"), Some("999.00")],
        ]);

        let cleaned = clean_transactions(&raw).unwrap();

        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].amount, "100.00".parse::<Decimal>().unwrap());
        assert_eq!(cleaned.dropped.duplicate_key, 1);
    }

    #[test]
    fn test_dedup_runs_before_amount_filter() {
        // First occurrence wins even when it is later rejected for its amount
        let raw = transactions(vec![
            [Some("t_001"), Some("c_001"), Some("-5")],
            [Some("t_001"), Some("c_001"), Some("10")],
        ]);

        let cleaned = clean_transactions(&raw).unwrap();

        assert!(cleaned.rows.is_empty());
        assert_eq!(cleaned.dropped.duplicate_key, 1);
        assert_eq!(cleaned.dropped.non_positive_amount, 1);
    }

    #[test]
    fn test_null_rows_do_not_claim_keys() {
        let raw = transactions(vec![
            [Some("t_001"), None, Some("10")],
            [Some("t_001"), Some("c_001"), Some("20")],
        ]);

        let cleaned = clean_transactions(&raw).unwrap();

        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].amount, Decimal::from(20));
        assert_eq!(cleaned.dropped.null_required, 1);
        assert_eq!(cleaned.dropped.duplicate_key, 0);
    }

    #[test]
    fn test_unparseable_and_zero_amounts() {
        let raw = transactions(vec![
            [Some("t_001"), Some("c_001"), Some("abc")],
            [Some("t_002"), Some("c_001"), Some("0.00")],
            [Some("t_003"), Some("c_001"), Some("2.5e1")],
        ]);

        let cleaned = clean_transactions(&raw).unwrap();

        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].amount, Decimal::from(25));
        assert_eq!(cleaned.dropped.invalid_amount, 1);
        assert_eq!(cleaned.dropped.non_positive_amount, 1);
        assert_eq!(cleaned.dropped.total(), 2);
    }

    #[test]
    fn test_missing_amount_column_is_schema_error() {
        let raw = RawTable::from_rows(
            "transactions",
            &["transaction_id", "customer_id"],
            vec![vec![Some("t_001"), Some("c_001")]],
        );

        let err = clean_transactions(&raw).unwrap_err();
        assert_eq!(err.table, "transactions");
        assert_eq!(err.missing, vec!["amount".to_string()]);
    }

    #[test]
    fn test_customers_keep_recognized_columns_only() {
        let raw = RawTable::from_rows(
            "customers",
            &["customer_id", "email", "country"],
            vec![
                vec![Some("c_001"), Some("a@example.com"), Some("NL")],
                vec![Some("c_001"), Some("dup@example.com"), Some("DE")],
                vec![Some("c_002"), None, Some("FR")],
                vec![Some("c_003"), Some("c@example.com"), None],
            ],
        );

        let cleaned = clean_customers(&raw).unwrap();

        assert_eq!(
            cleaned.rows,
            vec![
                Customer {
                    customer_id: "c_001".to_string(),
                    email: "a@example.com".to_string()
                },
                Customer {
                    customer_id: "c_003".to_string(),
                    email: "c@example.com".to_string()
                },
            ]
        );
        assert_eq!(cleaned.dropped.null_required, 1);
        assert_eq!(cleaned.dropped.duplicate_key, 1);
    }
}
