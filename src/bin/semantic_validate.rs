//! Semantic Validate - data quality checks over silver and gold
//!
//! Prints one ✓/✗ line per check and a summary. Exits non-zero when any
//! check fails.
//!
//! Usage:
//!   cargo run --release --bin semantic_validate -- --data-dir data

use clap::Parser;
use dotenv::dotenv;
use semantic_layer::validation::CheckStatus;
use semantic_layer::{DataValidator, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "semantic_validate", version, about = "Validate the silver and gold layers")]
struct Args {
    /// Data directory holding silver/ and gold/ (overrides SEMANTIC_DATA_DIR)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Only print failed checks
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    let mut config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let report = DataValidator::new(config).validate_all();

    println!("{}", "=".repeat(60));
    println!("DATA VALIDATION");
    println!("{}", "=".repeat(60));
    for result in &report.results {
        if !args.quiet || result.status == CheckStatus::Fail {
            println!("{}", result);
        }
    }
    println!("{}", "-".repeat(60));
    println!("Total checks: {}", report.total());
    println!("Passed: {}", report.passed());
    println!("Failed: {}", report.failed());

    if report.all_passed() {
        println!("✅ All validation checks passed");
        ExitCode::SUCCESS
    } else {
        println!("❌ {} check(s) failed", report.failed());
        ExitCode::FAILURE
    }
}
