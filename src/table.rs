//! Untyped raw tables loaded from delimited text
//!
//! Raw files are read as-is: a header row plus optional cells. Typing and
//! column selection happen in the cleaner, after the schema check.

use crate::error::{EtlError, EtlResult, SchemaError};
use crate::schema;
use std::path::Path;

/// Cell values treated as null in addition to empty / whitespace-only cells
pub const NULL_TOKENS: [&str; 7] = ["NA", "N/A", "NULL", "null", "NaN", "nan", "None"];

/// A raw table: normalized header names and rows of optional cells
#[derive(Debug, Clone)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Load a delimited file with a header row
    ///
    /// Header names are trimmed and lowercased. Rows shorter than the header
    /// yield nulls for the missing cells.
    pub fn load(name: &str, path: impl AsRef<Path>, delimiter: u8) -> EtlResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(EtlError::MissingInput {
                table: name.to_string(),
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| EtlError::csv(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EtlError::csv(path, e))?
            .iter()
            .map(normalize_header)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| EtlError::csv(path, e))?;
            let row = (0..headers.len())
                .map(|idx| record.get(idx).and_then(parse_cell))
                .collect();
            rows.push(row);
        }

        log::info!("📥 Loaded {}: {} rows from {}", name, rows.len(), path.display());

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    /// Build a table in memory (fixtures, tests)
    pub fn from_rows(name: &str, headers: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| normalize_header(h)).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| cell.and_then(parse_cell)).collect())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Resolve required columns to their indices, in the order given
    pub fn require(&self, required: &[&str]) -> Result<Vec<usize>, SchemaError> {
        schema::require_columns(&self.name, &self.headers, required)?;
        Ok(required
            .iter()
            .filter_map(|column| self.column_index(column))
            .collect())
    }

    /// Values of one column, `None` for nulls
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|cell| cell.as_deref()))
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn parse_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || NULL_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_normalizes_headers_and_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("customers.csv");
        fs::write(
            &path,
            " Customer_ID ,EMAIL,signup\nc_001,a@example.com,2024\nc_002,NULL,\n, b@example.com ,x\n",
        )
        .unwrap();

        let table = RawTable::load("customers", &path, b',').unwrap();

        assert_eq!(table.headers(), &["customer_id", "email", "signup"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1][1], None);
        assert_eq!(table.rows()[1][2], None);
        assert_eq!(table.rows()[2][0], None);
        assert_eq!(table.rows()[2][1].as_deref(), Some("b@example.com"));
    }

    #[test]
    fn test_short_rows_pad_with_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(&path, "transaction_id,customer_id,amount\nt_001,c_001\n").unwrap();

        let table = RawTable::load("transactions", &path, b',').unwrap();

        assert_eq!(table.rows()[0], vec![Some("t_001".to_string()), Some("c_001".to_string()), None]);
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let dir = tempdir().unwrap();
        let err = RawTable::load("customers", dir.path().join("nope.csv"), b',').unwrap_err();

        assert!(matches!(err, EtlError::MissingInput { ref table, .. } if table == "customers"));
    }

    #[test]
    fn test_require_reports_missing_columns() {
        let table = RawTable::from_rows("transactions", &["transaction_id", "customer_id"], vec![]);

        let err = table.require(&["transaction_id", "customer_id", "amount"]).unwrap_err();
        assert_eq!(err.missing, vec!["amount".to_string()]);

        let idx = table.require(&["customer_id", "transaction_id"]).unwrap();
        assert_eq!(idx, vec![1, 0]);
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("customers.csv");
        fs::write(&path, "customer_id;email\nc_001;a@example.com\n").unwrap();

        let table = RawTable::load("customers", &path, b';').unwrap();
        assert_eq!(table.column(1).collect::<Vec<_>>(), vec![Some("a@example.com")]);
    }
}
