//! Table descriptors: the local, authoritative declaration of one table.

mod manifest;

use std::fmt;
use crate::convert::to_schema;
use crate::error::{BqSchemaError, Result};
use crate::record::RecordType;
use crate::schema::{Column, PartitionConfig};

pub use manifest::TableManifest;

/// Where a descriptor's schema comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    Columns(Vec<Column>),
    Record(RecordType),
}

impl From<Vec<Column>> for SchemaSource {
    fn from(columns: Vec<Column>) -> Self {
        SchemaSource::Columns(columns)
    }
}

impl From<RecordType> for SchemaSource {
    fn from(record: RecordType) -> Self {
        SchemaSource::Record(record)
    }
}

/// Deduplication key used by discovery: `(project, dataset, name)`.
pub type TableKey = (Option<String>, Option<String>, String);

/// Declaration of a table's identity and schema.
///
/// `name` and `schema` have no meaningful default. Abstract descriptors that
/// exist only to share settings may leave them unimplemented; reading them
/// then fails with [`BqSchemaError::NotImplemented`].
pub trait TableDescriptor: Send + Sync {
    fn name(&self) -> Result<&str> {
        Err(self.not_implemented("name"))
    }

    fn schema(&self) -> Result<SchemaSource> {
        Err(self.not_implemented("schema"))
    }

    fn project(&self) -> Option<&str> {
        None
    }

    fn dataset(&self) -> Option<&str> {
        None
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn time_partitioning(&self) -> Option<PartitionConfig> {
        None
    }

    fn is_abstract(&self) -> bool {
        false
    }

    /// Human readable origin of the descriptor, used in error messages.
    fn descriptor_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    fn full_table_name(&self) -> Result<String> {
        let name = self.name()?;
        Ok(match self.version() {
            Some(version) => format!("{}_v{}", name, version),
            None => name.to_string(),
        })
    }

    /// The schema as columns, converting a record source.
    fn columns(&self) -> Result<Vec<Column>> {
        match self.schema()? {
            SchemaSource::Columns(columns) => Ok(columns),
            SchemaSource::Record(record) => to_schema(&record),
        }
    }

    fn key(&self) -> Result<TableKey> {
        Ok((
            self.project().map(str::to_string),
            self.dataset().map(str::to_string),
            self.name()?.to_string(),
        ))
    }

    fn not_implemented(&self, property: &'static str) -> BqSchemaError {
        BqSchemaError::NotImplemented {
            descriptor: self.descriptor_name(),
            property,
        }
    }
}

/// Fully qualified `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    pub fn parse(identifier: &str) -> Option<Self> {
        let mut parts = identifier.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(d), Some(t)) if !p.is_empty() && !d.is_empty() && !t.is_empty() => {
                Some(Self::new(p, d, t))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// A table as the warehouse currently reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTable {
    pub reference: TableRef,
    pub columns: Vec<Column>,
    pub time_partitioning: Option<PartitionConfig>,
}

impl RemoteTable {
    pub fn new(reference: TableRef, columns: Vec<Column>) -> Self {
        Self {
            reference,
            columns,
            time_partitioning: None,
        }
    }

    pub fn with_partitioning(mut self, partitioning: Option<PartitionConfig>) -> Self {
        self.time_partitioning = partitioning;
        self
    }
}
