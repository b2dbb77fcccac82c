//! Record types: statically declared data shapes used as table schema sources.
//!
//! A record type lists its fields in declaration order. Each field carries an
//! explicit [`FieldType`] describing how it maps onto a column: a host
//! primitive, a nested record, or an `Optional`/`Repeated` wrapper around one
//! of those.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::schema::HostType;

/// Implemented by Rust types that describe their own record shape.
pub trait Record {
    fn record_type() -> RecordType;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordType {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared type of a record field.
///
/// In YAML a scalar is written as its bare host name (`int`, `str`, ...);
/// wrappers and nested records use a single-key map
/// (`{optional: int}`, `{repeated: {nested: {...}}}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nested(RecordType),
    Optional(Box<FieldType>),
    Repeated(Box<FieldType>),
    #[serde(untagged)]
    Scalar(HostType),
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        self.fields.push(RecordField {
            name: name.into(),
            field_type: field_type.into(),
            description: None,
        });
        self
    }

    pub fn described_field(
        mut self,
        name: impl Into<String>,
        field_type: impl Into<FieldType>,
        description: impl Into<String>,
    ) -> Self {
        self.fields.push(RecordField {
            name: name.into(),
            field_type: field_type.into(),
            description: Some(description.into()),
        });
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl FieldType {
    pub fn optional(inner: impl Into<FieldType>) -> Self {
        FieldType::Optional(Box::new(inner.into()))
    }

    pub fn repeated(inner: impl Into<FieldType>) -> Self {
        FieldType::Repeated(Box::new(inner.into()))
    }

    pub fn nested(record: RecordType) -> Self {
        FieldType::Nested(record)
    }

    pub fn of<T: Record>() -> Self {
        FieldType::Nested(T::record_type())
    }
}

impl From<HostType> for FieldType {
    fn from(host: HostType) -> Self {
        FieldType::Scalar(host)
    }
}

impl From<RecordType> for FieldType {
    fn from(record: RecordType) -> Self {
        FieldType::Nested(record)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(host) => f.write_str(host.as_str()),
            FieldType::Nested(record) => f.write_str(&record.name),
            FieldType::Optional(inner) => write!(f, "Option<{}>", inner),
            FieldType::Repeated(inner) => write!(f, "Vec<{}>", inner),
        }
    }
}
