//! Semantic layer ETL
//!
//! Batch pipeline that turns raw customer and transaction CSVs into a
//! cleaned silver layer and a per-customer gold view, with a metadata
//! sidecar, post-run validation and a read-only query facade over gold.

pub mod aggregator;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod storage;
pub mod table;
pub mod validation;

pub use config::PipelineConfig;
pub use error::{EtlError, EtlResult, QueryError, SchemaError};
pub use model::{Customer, CustomerMetric, Transaction};
pub use pipeline::{run, PipelineReport};
pub use query::GoldQuery;
pub use validation::{DataValidator, ValidationReport};
