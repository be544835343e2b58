//! Semantic Pipeline - raw -> silver -> gold batch run
//!
//! Usage:
//!   cargo run --release --bin semantic_pipeline -- --data-dir data
//!
//! Environment variables:
//!   SEMANTIC_DATA_DIR - Layered data directory (default: data)
//!   SEMANTIC_DELIMITER - CSV field delimiter (default: ,)
//!   RUST_LOG - Log filter (default: info)

use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use semantic_layer::{pipeline, EtlResult, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "semantic_pipeline", version, about = "Build the silver and gold layers from raw CSVs")]
struct Args {
    /// Data directory holding raw/, silver/ and gold/ (overrides SEMANTIC_DATA_DIR)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
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
            error!("❌ Pipeline failed: {}", e);
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

    let report = pipeline::run(&config)?;

    info!("📊 Run summary:");
    info!("   ├─ Customers: {} raw -> {} silver", report.customers_raw, report.customers_silver);
    info!(
        "   ├─ Transactions: {} raw -> {} silver",
        report.transactions_raw, report.transactions_silver
    );
    info!("   ├─ Gold rows: {}", report.gold_rows);
    info!("   ├─ Total spend: {}", report.total_spend);
    info!(
        "   ├─ Orphan transactions: {}, customers without spend: {}",
        report.orphan_transactions, report.customers_without_spend
    );
    info!("   └─ Data quality warnings: {}", report.warnings.len());

    println!(
        "Pipeline complete: {} silver customers, {} silver transactions, {} gold rows",
        report.customers_silver, report.transactions_silver, report.gold_rows
    );

    Ok(())
}
