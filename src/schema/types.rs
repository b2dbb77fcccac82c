use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard SQL type of a column, with legacy spellings folded in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum BqType {
    String,
    Bytes,
    Int64,
    Float64,
    Numeric,
    Bignumeric,
    Bool,
    Timestamp,
    Date,
    Time,
    Datetime,
    Geography,
    Json,
    Struct,
}

impl BqType {
    /// Resolve a type tag as spelled in a schema. Legacy SQL names
    /// (`INTEGER`, `FLOAT`, `BOOLEAN`, `RECORD`, ...) resolve to their
    /// standard counterpart; anything else is `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let bq_type = match tag.trim().to_ascii_uppercase().as_str() {
            "STRING" => BqType::String,
            "BYTES" => BqType::Bytes,
            "INT64" | "INTEGER" => BqType::Int64,
            "FLOAT64" | "FLOAT" => BqType::Float64,
            "NUMERIC" | "DECIMAL" => BqType::Numeric,
            "BIGNUMERIC" | "BIGDECIMAL" => BqType::Bignumeric,
            "BOOL" | "BOOLEAN" => BqType::Bool,
            "TIMESTAMP" => BqType::Timestamp,
            "DATE" => BqType::Date,
            "TIME" => BqType::Time,
            "DATETIME" => BqType::Datetime,
            "GEOGRAPHY" => BqType::Geography,
            "JSON" => BqType::Json,
            "STRUCT" | "RECORD" => BqType::Struct,
            _ => return None,
        };
        Some(bq_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BqType::String => "STRING",
            BqType::Bytes => "BYTES",
            BqType::Int64 => "INT64",
            BqType::Float64 => "FLOAT64",
            BqType::Numeric => "NUMERIC",
            BqType::Bignumeric => "BIGNUMERIC",
            BqType::Bool => "BOOL",
            BqType::Timestamp => "TIMESTAMP",
            BqType::Date => "DATE",
            BqType::Time => "TIME",
            BqType::Datetime => "DATETIME",
            BqType::Geography => "GEOGRAPHY",
            BqType::Json => "JSON",
            BqType::Struct => "STRUCT",
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, BqType::Struct)
    }
}

impl fmt::Display for BqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BqType> for String {
    fn from(bq_type: BqType) -> Self {
        bq_type.as_str().to_string()
    }
}

/// Host-side primitive a record field can declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HostType {
    Str,
    Bytes,
    Int,
    Float,
    Decimal,
    Bool,
    Timestamp,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    Geography,
}

impl HostType {
    pub const ALL: [HostType; 11] = [
        HostType::Str,
        HostType::Bytes,
        HostType::Int,
        HostType::Float,
        HostType::Decimal,
        HostType::Bool,
        HostType::Timestamp,
        HostType::Date,
        HostType::Time,
        HostType::DateTime,
        HostType::Geography,
    ];

    pub fn bq_type(&self) -> BqType {
        match self {
            HostType::Str => BqType::String,
            HostType::Bytes => BqType::Bytes,
            HostType::Int => BqType::Int64,
            HostType::Float => BqType::Float64,
            HostType::Decimal => BqType::Numeric,
            HostType::Bool => BqType::Bool,
            HostType::Timestamp => BqType::Timestamp,
            HostType::Date => BqType::Date,
            HostType::Time => BqType::Time,
            HostType::DateTime => BqType::Datetime,
            HostType::Geography => BqType::Geography,
        }
    }

    pub fn from_bq_type(bq_type: BqType) -> Option<Self> {
        HostType::ALL.into_iter().find(|host| host.bq_type() == bq_type)
    }

    /// Rust type used when rendering a record declaration.
    pub fn rust_type(&self) -> &'static str {
        match self {
            HostType::Str | HostType::Geography => "String",
            HostType::Bytes => "Vec<u8>",
            HostType::Int => "i64",
            HostType::Float => "f64",
            HostType::Decimal => "Decimal",
            HostType::Bool => "bool",
            HostType::Timestamp => "DateTime<Utc>",
            HostType::Date => "NaiveDate",
            HostType::Time => "NaiveTime",
            HostType::DateTime => "NaiveDateTime",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::Str => "str",
            HostType::Bytes => "bytes",
            HostType::Int => "int",
            HostType::Float => "float",
            HostType::Decimal => "decimal",
            HostType::Bool => "bool",
            HostType::Timestamp => "timestamp",
            HostType::Date => "date",
            HostType::Time => "time",
            HostType::DateTime => "datetime",
            HostType::Geography => "geography",
        }
    }
}
