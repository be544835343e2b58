//! Pipeline configuration from environment variables
//!
//! Every stage receives its paths from a `PipelineConfig` value. Nothing
//! reads ambient globals past this point.

use crate::error::{EtlError, EtlResult};
use std::env;
use std::path::{Path, PathBuf};

pub const CUSTOMERS_RAW_FILE: &str = "customers.csv";
pub const TRANSACTIONS_RAW_FILE: &str = "transactions.csv";
pub const CUSTOMERS_SILVER_FILE: &str = "customers_silver.csv";
pub const TRANSACTIONS_SILVER_FILE: &str = "transactions_silver.csv";
pub const GOLD_VIEW_FILE: &str = "gold_view.csv";
pub const METADATA_FILE: &str = "metadata.json";

/// Locations of the three layers plus the metadata sidecar
///
/// Layout under `data_dir`:
/// ```text
/// raw/customers.csv            raw/transactions.csv
/// silver/customers_silver.csv  silver/transactions_silver.csv
/// gold/gold_view.csv
/// metadata.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Root of the layered data directory
    pub data_dir: PathBuf,

    /// Field delimiter used for every CSV layer
    pub delimiter: u8,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SEMANTIC_DATA_DIR` (default: data)
    /// - `SEMANTIC_DELIMITER` (default: ,) - must be a single ASCII character
    pub fn from_env() -> EtlResult<Self> {
        let data_dir = env::var("SEMANTIC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let delimiter = match env::var("SEMANTIC_DELIMITER") {
            Ok(raw) => parse_delimiter(&raw)?,
            Err(_) => b',',
        };

        Ok(Self {
            data_dir,
            delimiter,
        })
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            delimiter: b',',
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn silver_dir(&self) -> PathBuf {
        self.data_dir.join("silver")
    }

    pub fn gold_dir(&self) -> PathBuf {
        self.data_dir.join("gold")
    }

    pub fn customers_raw_path(&self) -> PathBuf {
        self.raw_dir().join(CUSTOMERS_RAW_FILE)
    }

    pub fn transactions_raw_path(&self) -> PathBuf {
        self.raw_dir().join(TRANSACTIONS_RAW_FILE)
    }

    pub fn customers_silver_path(&self) -> PathBuf {
        self.silver_dir().join(CUSTOMERS_SILVER_FILE)
    }

    pub fn transactions_silver_path(&self) -> PathBuf {
        self.silver_dir().join(TRANSACTIONS_SILVER_FILE)
    }

    pub fn gold_path(&self) -> PathBuf {
        self.gold_dir().join(GOLD_VIEW_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    /// Path relative to the data directory, for log lines and reports
    pub fn display_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.data_dir).unwrap_or(path)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

fn parse_delimiter(raw: &str) -> EtlResult<u8> {
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ if raw == "\\t" => Ok(b'\t'),
        _ => Err(EtlError::InvalidConfig(format!(
            "SEMANTIC_DELIMITER must be a single ASCII character, got '{}'",
            raw
        ))),
    }
}
