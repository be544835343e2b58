//! Semantic Query - canned analytics over the gold view
//!
//! Loads gold/gold_view.csv into a read-only SQLite table and prints top
//! spenders, customers above a spend threshold, activity segments, the
//! spend distribution, an overall summary and data quality figures.
//!
//! Usage:
//!   cargo run --release --bin semantic_query -- --top 5 --min-spend 100

use clap::Parser;
use dotenv::dotenv;
use log::error;
use rust_decimal::Decimal;
use semantic_layer::query::{RankedCustomer, SegmentField};
use semantic_layer::{EtlResult, GoldQuery, PipelineConfig, QueryError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "semantic_query", version, about = "Query the gold customer view")]
struct Args {
    /// Data directory holding gold/ (overrides SEMANTIC_DATA_DIR)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Number of customers in the ranked listings
    #[arg(long, default_value = "5", value_name = "N")]
    top: usize,

    /// Spend threshold for the high-value listing (strictly greater than)
    #[arg(long, default_value = "100", value_name = "AMOUNT")]
    min_spend: Decimal,
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Query failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> EtlResult<()> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let gold = GoldQuery::open(config.gold_path(), config.delimiter)?;
    println!("Gold view: {} customer rows\n", gold.row_count());

    println!("=== Top {} customers by spend ===", args.top);
    print_ranked(&gold.top_by_spend(args.top)?);

    println!("\n=== Customers with spend > {} ===", args.min_spend);
    print_ranked(&gold.spend_above(args.min_spend)?);

    println!("\n=== Top {} customers by transaction count ===", args.top);
    print_ranked(&gold.top_by_transaction_count(args.top)?);

    println!("\n=== Activity segments ===");
    let boundaries = [Decimal::from(2), Decimal::from(4)];
    for segment in gold.segment(SegmentField::TransactionCount, &boundaries)? {
        println!(
            "{:<12} customers={:<6} spend={}",
            segment.label, segment.customers, segment.total_spend
        );
    }

    match gold.spend_distribution() {
        Ok(dist) => {
            println!("\n=== Spend distribution ===");
            println!("Q1={} median={} Q3={}", dist.q1, dist.median, dist.q3);
            println!(
                "low={} mid-low={} mid-high={} high={}",
                dist.low, dist.mid_low, dist.mid_high, dist.high
            );
        }
        Err(QueryError::EmptyTable(_)) => println!("\n(no gold rows: distribution skipped)"),
        Err(e) => return Err(e.into()),
    }

    match gold.summary() {
        Ok(summary) => {
            println!("\n=== Summary ===");
            println!("Total customers:        {}", summary.total_customers);
            println!("Total transactions:     {}", summary.total_transactions);
            println!("Total revenue:          {}", summary.total_revenue);
            println!("Avg customer value:     {}", summary.avg_customer_value);
            println!("Avg transactions:       {}", summary.avg_transactions);
            println!("Avg transaction amount: {}", summary.avg_transaction_amount);
            println!("Min / max spend:        {} / {}", summary.min_spend, summary.max_spend);
        }
        Err(QueryError::EmptyTable(_)) => println!("\n(no gold rows: summary skipped)"),
        Err(e) => return Err(e.into()),
    }

    let quality = gold.data_quality()?;
    println!("\n=== Data quality ===");
    println!("Total records:       {}", quality.total_records);
    println!("Missing values:      {}", quality.missing_values);
    println!("Duplicate customers: {}", quality.duplicate_customers);
    println!("Columns:             {}", quality.columns.join(", "));

    Ok(())
}

fn print_ranked(rows: &[RankedCustomer]) {
    if rows.is_empty() {
        println!("(none)");
        return;
    }
    println!("{:<16} {:>12} {:>6} {:>12}", "customer_id", "total_spend", "txns", "avg_amount");
    for row in rows {
        println!(
            "{:<16} {:>12} {:>6} {:>12}",
            row.customer_id, row.total_spend, row.transaction_count, row.avg_transaction_amount
        );
    }
}
