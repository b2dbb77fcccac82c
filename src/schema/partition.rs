use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionType {
    Hour,
    #[default]
    Day,
    Month,
    Year,
}

impl PartitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionType::Hour => "HOUR",
            PartitionType::Day => "DAY",
            PartitionType::Month => "MONTH",
            PartitionType::Year => "YEAR",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "HOUR" => Some(PartitionType::Hour),
            "DAY" => Some(PartitionType::Day),
            "MONTH" => Some(PartitionType::Month),
            "YEAR" => Some(PartitionType::Year),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time partitioning applied when a missing table is created.
/// A `None` field means ingestion-time partitioning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PartitionConfig {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(rename = "type", default)]
    pub partition_type: PartitionType,
    #[serde(default)]
    pub expiration_ms: Option<i64>,
    #[serde(default)]
    pub require_partition_filter: Option<bool>,
}

impl PartitionConfig {
    pub fn day(field: impl Into<String>) -> Self {
        Self::on(field, PartitionType::Day)
    }

    pub fn hour(field: impl Into<String>) -> Self {
        Self::on(field, PartitionType::Hour)
    }

    pub fn month(field: impl Into<String>) -> Self {
        Self::on(field, PartitionType::Month)
    }

    pub fn year(field: impl Into<String>) -> Self {
        Self::on(field, PartitionType::Year)
    }

    pub fn ingestion_time(partition_type: PartitionType) -> Self {
        Self {
            partition_type,
            ..Self::default()
        }
    }

    pub fn with_expiration_ms(mut self, expiration_ms: i64) -> Self {
        self.expiration_ms = Some(expiration_ms);
        self
    }

    fn on(field: impl Into<String>, partition_type: PartitionType) -> Self {
        Self {
            field: Some(field.into()),
            partition_type,
            ..Self::default()
        }
    }
}
