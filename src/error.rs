//! Error types for the raw -> silver -> gold pipeline
//!
//! Fatal conditions abort the run before anything is published:
//! - `MissingInput` - a raw file is absent
//! - `Schema` - a required column is absent
//! - `AggregationOverflow` - a customer's total exceeds the decimal range
//!
//! Dropped rows are not errors. They are reported as
//! [`DataQualityWarning`](crate::cleaner::DataQualityWarning) counts.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type EtlResult<T> = Result<T, EtlError>;

/// Top-level error for every pipeline stage
#[derive(Error, Debug)]
pub enum EtlError {
    /// Required raw input file is absent
    #[error("Missing input for table '{table}': {} not found", .path.display())]
    MissingInput { table: String, path: PathBuf },

    /// Required column absent from an input header
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Decimal sum left the representable range
    #[error("Aggregation overflow while summing amounts for customer '{customer_id}'")]
    AggregationOverflow { customer_id: String },

    /// Gold query layer failure
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration value could not be used
    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EtlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        EtlError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// A table is missing one or more required columns
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub table: String,
    pub missing: Vec<String>,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table '{}' is missing required column(s): {}",
            self.table,
            self.missing.join(", ")
        )
    }
}

/// Errors surfaced by the gold query facade
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("gold table not found at {}", .0.display())]
    TableMissing(PathBuf),

    #[error("operation '{0}' requires at least one gold row")]
    EmptyTable(&'static str),

    #[error("invalid gold row: {0}")]
    InvalidRow(String),

    #[error("invalid query argument: {0}")]
    InvalidArgument(String),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_every_missing_column() {
        let err = SchemaError {
            table: "transactions".to_string(),
            missing: vec!["customer_id".to_string(), "amount".to_string()],
        };

        let msg = EtlError::from(err).to_string();
        assert!(msg.contains("transactions"));
        assert!(msg.contains("customer_id, amount"));
    }

    #[test]
    fn test_missing_input_names_path() {
        let err = EtlError::MissingInput {
            table: "customers".to_string(),
            path: PathBuf::from("data/raw/customers.csv"),
        };

        assert!(err.to_string().contains("data/raw/customers.csv"));
    }
}
