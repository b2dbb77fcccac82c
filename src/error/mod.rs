mod bq_error;
mod parser;

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub use bq_error::BigQueryError;
pub use parser::{parse_bq_error, ErrorContext};

#[derive(Error, Debug)]
pub enum BqSchemaError {
    #[error("BigQuery error: {0}")]
    BigQuery(#[from] BigQueryError),

    #[error("BigQuery client error: {0}")]
    Client(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("{missing} has not been set for table '{table}'")]
    UnresolvedLocation {
        table: String,
        missing: &'static str,
    },

    #[error("{descriptor} does not implement '{property}'")]
    NotImplemented {
        descriptor: String,
        property: &'static str,
    },

    #[error("Table discovery error: {0}")]
    Discovery(String),

    #[error("Schema validation failed: {0}")]
    Validation(ValidationFailure),

    #[error("Invalid row: {0}")]
    Row(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BqSchemaError {
    /// True when the error is the warehouse reporting that a table is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BqSchemaError::BigQuery(BigQueryError::TableNotFound { .. }))
    }
}

/// Per-table diagnostics collected by a `--validate` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationFailure {
    pub tables: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, table_identifier: &str) -> bool {
        self.tables.contains_key(table_identifier)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} table(s) out of sync", self.tables.len())?;
        for (table, messages) in &self.tables {
            write!(f, "\n  {table}:")?;
            for message in messages {
                write!(f, "\n    - {message}")?;
            }
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, BqSchemaError>;
