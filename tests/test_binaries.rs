//! Exit-code tests for the command-line entry points
//!
//! Each test builds a data directory in a tempdir and runs the compiled
//! binary against it with `--data-dir`:
//! - semantic_pipeline succeeds on a valid fixture
//! - semantic_pipeline fails when a required column is missing
//! - semantic_validate succeeds after a run and fails on tampered gold
//! - semantic_query succeeds over pipeline output

#[cfg(test)]
mod binary_exit_code_tests {
    use semantic_layer::PipelineConfig;
    use std::fs;
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::{tempdir, TempDir};

    const CUSTOMERS: &str = "customer_id,email\n\
                             c_001,alice@example.com\n\
                             c_002,bob@example.com\n";

    const TRANSACTIONS: &str = "transaction_id,customer_id,amount\n\
                                t_001,c_001,100.00\n\
                                t_002,c_001,50.50\n\
                                t_003,c_002,150.00\n";

    fn setup(transactions: &str) -> (TempDir, PipelineConfig) {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::with_data_dir(dir.path());
        fs::create_dir_all(config.raw_dir()).unwrap();
        fs::write(config.customers_raw_path(), CUSTOMERS).unwrap();
        fs::write(config.transactions_raw_path(), transactions).unwrap();
        (dir, config)
    }

    /// Run a binary with a clean environment, from inside the temp dir so no
    /// stray `.env` is picked up
    fn run(bin: &str, data_dir: &Path) -> Output {
        Command::new(bin)
            .arg("--data-dir")
            .arg(data_dir)
            .current_dir(data_dir)
            .env_remove("SEMANTIC_DATA_DIR")
            .env_remove("SEMANTIC_DELIMITER")
            .env("RUST_LOG", "warn")
            .output()
            .unwrap()
    }

    fn pipeline(data_dir: &Path) -> Output {
        run(env!("CARGO_BIN_EXE_semantic_pipeline"), data_dir)
    }

    fn validate(data_dir: &Path) -> Output {
        run(env!("CARGO_BIN_EXE_semantic_validate"), data_dir)
    }

    #[test]
    fn test_pipeline_exits_zero_on_valid_input() {
        let (dir, config) = setup(TRANSACTIONS);

        let output = pipeline(dir.path());

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        assert!(config.gold_path().exists());
    }

    #[test]
    fn test_pipeline_exits_non_zero_on_missing_column() {
        let (dir, config) = setup("transaction_id,customer_id\nt_001,c_001\n");

        let output = pipeline(dir.path());

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("amount"));
        assert!(!config.gold_path().exists());
    }

    #[test]
    fn test_validate_exit_code_follows_checks() {
        let (dir, config) = setup(TRANSACTIONS);
        assert!(pipeline(dir.path()).status.success());

        let clean = validate(dir.path());
        assert!(clean.status.success(), "stdout: {}", String::from_utf8_lossy(&clean.stdout));

        fs::write(
            config.gold_path(),
            "customer_id,total_spend,transaction_count,avg_transaction_amount\n\
             c_001,150.50,2,75.25\n\
             c_002,999.00,1,999.00\n",
        )
        .unwrap();

        let tampered = validate(dir.path());
        assert!(!tampered.status.success());
        assert!(String::from_utf8_lossy(&tampered.stdout).contains("✗ Gold aggregations"));
    }

    #[test]
    fn test_query_exits_zero_over_pipeline_output() {
        let (dir, _config) = setup(TRANSACTIONS);
        assert!(pipeline(dir.path()).status.success());

        let output = run(env!("CARGO_BIN_EXE_semantic_query"), dir.path());

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        assert!(String::from_utf8_lossy(&output.stdout).contains("c_001"));
    }
}
