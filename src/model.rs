//! Typed records for the silver and gold layers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Silver customer row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub email: String,
}

/// Silver transaction row, `amount > 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Gold row: one per customer with at least one valid transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMetric {
    pub customer_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_spend: Decimal,
    pub transaction_count: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_transaction_amount: Decimal,
}

impl CustomerMetric {
    /// Build a metric from a non-empty group total
    ///
    /// Returns `None` when `transaction_count` is zero.
    pub fn from_totals(customer_id: String, total_spend: Decimal, transaction_count: u64) -> Option<Self> {
        if transaction_count == 0 {
            return None;
        }

        let avg_transaction_amount = total_spend.checked_div(Decimal::from(transaction_count))?;

        Some(Self {
            customer_id,
            total_spend,
            transaction_count,
            avg_transaction_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_average_is_exact_mean() {
        let metric = CustomerMetric::from_totals("c_001".to_string(), "150.50".parse().unwrap(), 2).unwrap();

        assert_eq!(metric.avg_transaction_amount, "75.25".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_metric_requires_transactions() {
        assert!(CustomerMetric::from_totals("c_001".to_string(), Decimal::ZERO, 0).is_none());
    }

    #[test]
    fn test_transaction_amount_serializes_as_text() {
        let txn = Transaction {
            transaction_id: "t_001".to_string(),
            customer_id: "c_001".to_string(),
            amount: "100.00".parse().unwrap(),
        };

        let json = serde_json::to_string(&txn).unwrap();
        assert!(json.contains(r#""amount":"100.00""#));
    }
}
