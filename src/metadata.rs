//! JSON metadata sidecar describing each persisted table
//!
//! ```json
//! {
//!   "tables": {
//!     "gold_view": {
//!       "columns": ["customer_id", "total_spend", ...],
//!       "rows": 2,
//!       "updated": "2024-05-01T10:00:00Z",
//!       "metrics": [{"name": "total_spend", "expression": "SUM(amount)"}]
//!     }
//!   }
//! }
//! ```
//!
//! Recording a table replaces its previous entry. Entries for other tables
//! already in the file are kept. The pipeline never reads this file back.

use crate::error::EtlResult;
use crate::storage::Staging;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub columns: Vec<String>,
    pub rows: usize,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub tables: BTreeMap<String, TableMetadata>,
}

/// Gold metric definitions recorded alongside the gold table entry
pub fn gold_metric_definitions() -> Vec<MetricDefinition> {
    [
        ("total_spend", "SUM(amount)"),
        ("transaction_count", "COUNT(transaction_id)"),
        ("avg_transaction_amount", "SUM(amount) / COUNT(transaction_id)"),
    ]
    .into_iter()
    .map(|(name, expression)| MetricDefinition {
        name: name.to_string(),
        expression: expression.to_string(),
    })
    .collect()
}

pub struct MetadataWriter {
    path: PathBuf,
    updated: DateTime<Utc>,
    entries: BTreeMap<String, TableMetadata>,
}

impl MetadataWriter {
    /// All entries recorded by one writer share a single generation timestamp
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::at(path, Utc::now())
    }

    pub fn at(path: impl Into<PathBuf>, updated: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            updated,
            entries: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, table: &str, columns: &[&str], rows: usize) -> &mut Self {
        self.record_with_metrics(table, columns, rows, Vec::new())
    }

    pub fn record_with_metrics(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: usize,
        metrics: Vec<MetricDefinition>,
    ) -> &mut Self {
        self.entries.insert(
            table.to_string(),
            TableMetadata {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                updated: self.updated,
                metrics,
            },
        );
        self
    }

    /// Merge recorded entries with the sidecar already on disk
    fn document(&self) -> MetadataDocument {
        let mut document = load_existing(&self.path);

        for (table, entry) in &self.entries {
            document.tables.insert(table.clone(), entry.clone());
        }
        document
    }

    /// Stage the merged sidecar so it publishes with the layer files
    pub fn stage(&self, staging: &mut Staging) -> EtlResult<MetadataDocument> {
        let document = self.document();
        let json = serde_json::to_vec_pretty(&document)?;
        staging.stage_bytes(&self.path, &json)?;

        log::info!(
            "📝 Metadata staged for {} ({} table(s))",
            self.path.display(),
            self.entries.len()
        );
        Ok(document)
    }
}

/// An unreadable or malformed sidecar is replaced, not an error
fn load_existing(path: &Path) -> MetadataDocument {
    let Ok(json) = fs::read_to_string(path) else {
        return MetadataDocument::default();
    };

    match serde_json::from_str(&json) {
        Ok(document) => document,
        Err(e) => {
            log::warn!("⚠️  Ignoring unreadable metadata at {}: {}", path.display(), e);
            MetadataDocument::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn commit(writer: &MetadataWriter) -> MetadataDocument {
        let mut staging = Staging::new(b',');
        let document = writer.stage(&mut staging).unwrap();
        staging.commit().unwrap();
        document
    }

    #[test]
    fn test_writes_one_entry_per_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let mut writer = MetadataWriter::at(&path, ts);
        writer
            .record("customers_silver", &["customer_id", "email"], 3)
            .record_with_metrics("gold_view", &["customer_id", "total_spend"], 2, gold_metric_definitions());
        commit(&writer);

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["tables"]["customers_silver"]["rows"], 3);
        assert_eq!(parsed["tables"]["customers_silver"]["columns"][1], "email");
        assert_eq!(parsed["tables"]["customers_silver"]["updated"], "2024-05-01T10:00:00Z");
        assert!(parsed["tables"]["customers_silver"].get("metrics").is_none());
        assert_eq!(parsed["tables"]["gold_view"]["metrics"][0]["expression"], "SUM(amount)");
    }

    #[test]
    fn test_overwrites_same_table_and_keeps_others() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");

        let mut first = MetadataWriter::new(&path);
        first.record("gold_view", &["customer_id"], 10).record("legacy", &["x"], 1);
        commit(&first);

        let mut second = MetadataWriter::new(&path);
        second.record("gold_view", &["customer_id"], 4);
        let document = commit(&second);

        assert_eq!(document.tables.len(), 2);
        assert_eq!(document.tables["gold_view"].rows, 4);
        assert_eq!(document.tables["legacy"].rows, 1);
    }

    #[test]
    fn test_malformed_sidecar_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{ not json").unwrap();

        let mut writer = MetadataWriter::new(&path);
        writer.record("gold_view", &["customer_id"], 0);
        let document = commit(&writer);

        assert_eq!(document.tables.len(), 1);
    }
}
