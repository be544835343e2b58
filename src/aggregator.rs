//! Silver -> Gold customer metrics
//!
//! Groups silver transactions by `customer_id` and computes exact decimal
//! sum, count and mean. Nothing is rounded here; rounding is a presentation
//! concern of the query layer.

use crate::error::{EtlError, EtlResult};
use crate::model::{Customer, CustomerMetric, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

/// Running totals for one customer
#[derive(Debug, Clone, Copy, Default)]
struct SpendTotals {
    total_spend: Decimal,
    transaction_count: u64,
}

/// Gold rows plus referential diagnostics
#[derive(Debug, Clone, Default)]
pub struct GoldView {
    /// Sorted ascending by `customer_id`
    pub metrics: Vec<CustomerMetric>,
    /// Transactions whose `customer_id` is not a silver customer (kept)
    pub orphan_transactions: usize,
    /// Silver customers with no valid transaction (absent from `metrics`)
    pub customers_without_spend: usize,
}

/// Group transactions into one metric per customer
///
/// Empty input yields an empty result. Customers only appear if they have
/// at least one transaction.
pub fn aggregate(transactions: &[Transaction]) -> EtlResult<Vec<CustomerMetric>> {
    let mut groups: BTreeMap<&str, SpendTotals> = BTreeMap::new();

    for txn in transactions {
        let totals = groups.entry(txn.customer_id.as_str()).or_default();
        totals.total_spend = totals
            .total_spend
            .checked_add(txn.amount)
            .ok_or_else(|| EtlError::AggregationOverflow {
                customer_id: txn.customer_id.clone(),
            })?;
        totals.transaction_count += 1;
    }

    groups
        .into_iter()
        .map(|(customer_id, totals)| {
            CustomerMetric::from_totals(customer_id.to_string(), totals.total_spend, totals.transaction_count)
                .ok_or_else(|| EtlError::AggregationOverflow {
                    customer_id: customer_id.to_string(),
                })
        })
        .collect()
}

/// Build the gold view and count customer/transaction mismatches
///
/// Orphan transactions are still aggregated; referential integrity is
/// reported, not enforced.
pub fn build_gold_view(customers: &[Customer], transactions: &[Transaction]) -> EtlResult<GoldView> {
    let known: HashSet<&str> = customers.iter().map(|c| c.customer_id.as_str()).collect();

    let orphan_transactions = transactions
        .iter()
        .filter(|t| !known.contains(t.customer_id.as_str()))
        .count();

    let metrics = aggregate(transactions)?;

    let with_spend: HashSet<&str> = metrics.iter().map(|m| m.customer_id.as_str()).collect();
    let customers_without_spend = known.iter().filter(|id| !with_spend.contains(*id)).count();

    log::info!(
        "💰 Gold view built: {} customer records from {} transactions",
        metrics.len(),
        transactions.len()
    );
    if orphan_transactions > 0 {
        log::warn!(
            "⚠️  {} transaction(s) reference customers missing from the silver customers table",
            orphan_transactions
        );
    }
    if customers_without_spend > 0 {
        log::info!("   └─ {} customer(s) without valid transactions excluded", customers_without_spend);
    }

    Ok(GoldView {
        metrics,
        orphan_transactions,
        customers_without_spend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn txn(id: &str, customer: &str, amount: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            customer_id: customer.to_string(),
            amount: dec(amount),
        }
    }

    fn customer(id: &str) -> Customer {
        Customer {
            customer_id: id.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    #[test]
    fn test_groups_by_customer() {
        let metrics = aggregate(&[
            txn("t_001", "c_001", "100.00"),
            txn("t_002", "c_001", "50.50"),
            txn("t_003", "c_002", "150.00"),
        ])
        .unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].customer_id, "c_001");
        assert_eq!(metrics[0].total_spend, dec("150.50"));
        assert_eq!(metrics[0].transaction_count, 2);
        assert_eq!(metrics[0].avg_transaction_amount, dec("75.25"));
        assert_eq!(metrics[1].customer_id, "c_002");
        assert_eq!(metrics[1].total_spend, dec("150.00"));
        assert_eq!(metrics[1].avg_transaction_amount, dec("150.00"));
    }

    #[test]
    fn test_output_sorted_by_customer_id() {
        let metrics = aggregate(&[
            txn("t_1", "c_9", "1"),
            txn("t_2", "c_1", "1"),
            txn("t_3", "c_5", "1"),
        ])
        .unwrap();

        let ids: Vec<&str> = metrics.iter().map(|m| m.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["c_1", "c_5", "c_9"]);
    }

    #[test]
    fn test_empty_input_is_empty_gold() {
        assert!(aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_spend_is_conserved_without_cent_drift() {
        let transactions: Vec<Transaction> = (0..1000)
            .map(|i| txn(&format!("t_{}", i), &format!("c_{}", i % 7), "0.10"))
            .collect();

        let metrics = aggregate(&transactions).unwrap();
        let total: Decimal = metrics.iter().map(|m| m.total_spend).sum();

        assert_eq!(total, dec("100.00"));
        for metric in &metrics {
            assert_eq!(
                metric.avg_transaction_amount,
                metric.total_spend / Decimal::from(metric.transaction_count)
            );
        }
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = aggregate(&[
            txn("t_1", "c_1", &Decimal::MAX.to_string()),
            txn("t_2", "c_1", &Decimal::MAX.to_string()),
        ])
        .unwrap_err();

        assert!(matches!(err, EtlError::AggregationOverflow { ref customer_id } if customer_id == "c_1"));
    }

    #[test]
    fn test_gold_view_reports_orphans_and_idle_customers() {
        let view = build_gold_view(
            &[customer("c_001"), customer("c_002"), customer("c_003")],
            &[
                txn("t_001", "c_001", "10"),
                txn("t_002", "c_999", "5"),
            ],
        )
        .unwrap();

        assert_eq!(view.metrics.len(), 2);
        assert_eq!(view.orphan_transactions, 1);
        assert_eq!(view.customers_without_spend, 2);
        assert!(view.metrics.iter().any(|m| m.customer_id == "c_999"));
    }
}
