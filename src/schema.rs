//! Schema contracts and pure validation checks
//!
//! Each layer's table has a fixed column list. The checks here only report;
//! callers decide whether to drop rows or abort.

use crate::error::SchemaError;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Column contract for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub key: &'static str,
}

pub const CUSTOMERS: TableSchema = TableSchema {
    name: "customers",
    columns: &["customer_id", "email"],
    key: "customer_id",
};

pub const TRANSACTIONS: TableSchema = TableSchema {
    name: "transactions",
    columns: &["transaction_id", "customer_id", "amount"],
    key: "transaction_id",
};

pub const CUSTOMERS_SILVER: TableSchema = TableSchema {
    name: "customers_silver",
    ..CUSTOMERS
};

pub const TRANSACTIONS_SILVER: TableSchema = TableSchema {
    name: "transactions_silver",
    ..TRANSACTIONS
};

pub const GOLD_VIEW: TableSchema = TableSchema {
    name: "gold_view",
    columns: &[
        "customer_id",
        "total_spend",
        "transaction_count",
        "avg_transaction_amount",
    ],
    key: "customer_id",
};

/// Confirm every required column is present
///
/// The error lists missing columns in the order they were required.
pub fn require_columns<S: AsRef<str>>(
    table: &str,
    headers: &[S],
    required: &[&str],
) -> Result<(), SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h.as_ref() == **column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            table: table.to_string(),
            missing,
        })
    }
}

/// Outcome of a key column check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCheck {
    /// Rows whose key is null
    pub nulls: usize,
    /// Rows whose key already appeared earlier in the column
    pub duplicates: usize,
}

impl KeyCheck {
    pub fn is_clean(&self) -> bool {
        self.nulls == 0 && self.duplicates == 0
    }
}

pub fn check_key<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> KeyCheck {
    let mut seen = HashSet::new();
    let mut check = KeyCheck::default();

    for value in values {
        match value {
            None => check.nulls += 1,
            Some(key) => {
                if !seen.insert(key) {
                    check.duplicates += 1;
                }
            }
        }
    }

    check
}

/// Count non-null values that fail `predicate`
///
/// Values that do not parse as decimals count as violations.
pub fn count_violations<'a, F>(values: impl IntoIterator<Item = Option<&'a str>>, predicate: F) -> usize
where
    F: Fn(Decimal) -> bool,
{
    values
        .into_iter()
        .flatten()
        .filter(|raw| !parse_decimal(raw).is_some_and(&predicate))
        .count()
}

/// Parse a decimal cell, accepting plain and scientific notation
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    trimmed
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}
