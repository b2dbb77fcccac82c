//! Access to the warehouse holding the remote tables.

mod bigquery;
mod memory;

use async_trait::async_trait;
use crate::error::Result;
use crate::schema::{Column, PartitionConfig};

pub use crate::table::{RemoteTable, TableRef};
pub use bigquery::{connect, BqClient, SERVICE_FILE_ENV};
pub use memory::MemoryClient;

/// The three table operations migrations need.
///
/// `get_table` must report an absent table as
/// `BigQueryError::TableNotFound` so callers can tell it apart from
/// other failures.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn get_table(&self, table: &TableRef) -> Result<RemoteTable>;

    async fn create_table(
        &self,
        table: &TableRef,
        columns: &[Column],
        partitioning: Option<&PartitionConfig>,
    ) -> Result<RemoteTable>;

    /// Push the listed properties of `table`. Only `"schema"` is used.
    async fn update_table(&self, table: &RemoteTable, fields: &[&str]) -> Result<RemoteTable>;
}
