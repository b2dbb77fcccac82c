use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use crate::error::{BigQueryError, BqSchemaError, Result};
use crate::schema::{Column, PartitionConfig};
use super::{RemoteTable, TableRef, WarehouseClient};

/// In-memory warehouse. Dry runs and tests use it in place of BigQuery.
#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<TableRef, RemoteTable>,
    failures: HashMap<TableRef, BigQueryError>,
    created: Vec<TableRef>,
    updated: Vec<TableRef>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: RemoteTable) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&self, table: RemoteTable) {
        self.state().tables.insert(table.reference.clone(), table);
    }

    /// Make every call touching `table` fail with `error`.
    pub fn fail_on(&self, table: TableRef, error: BigQueryError) {
        self.state().failures.insert(table, error);
    }

    pub fn table(&self, table: &TableRef) -> Option<RemoteTable> {
        self.state().tables.get(table).cloned()
    }

    pub fn created(&self) -> Vec<TableRef> {
        self.state().created.clone()
    }

    pub fn updated(&self) -> Vec<TableRef> {
        self.state().updated.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryState {
    fn check(&self, table: &TableRef) -> Result<()> {
        match self.failures.get(table) {
            Some(error) => Err(BqSchemaError::BigQuery(error.clone())),
            None => Ok(()),
        }
    }
}

fn not_found(table: &TableRef) -> BqSchemaError {
    BqSchemaError::BigQuery(BigQueryError::TableNotFound {
        project: table.project.clone(),
        dataset: table.dataset.clone(),
        table: table.table.clone(),
    })
}

#[async_trait]
impl WarehouseClient for MemoryClient {
    async fn get_table(&self, table: &TableRef) -> Result<RemoteTable> {
        let state = self.state();
        state.check(table)?;
        state.tables.get(table).cloned().ok_or_else(|| not_found(table))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        columns: &[Column],
        partitioning: Option<&PartitionConfig>,
    ) -> Result<RemoteTable> {
        let mut state = self.state();
        state.check(table)?;
        if state.tables.contains_key(table) {
            return Err(BqSchemaError::BigQuery(BigQueryError::AlreadyExists {
                resource: table.to_string(),
            }));
        }

        let created = RemoteTable::new(table.clone(), columns.to_vec())
            .with_partitioning(partitioning.cloned());
        state.tables.insert(table.clone(), created.clone());
        state.created.push(table.clone());
        Ok(created)
    }

    async fn update_table(&self, table: &RemoteTable, fields: &[&str]) -> Result<RemoteTable> {
        let mut state = self.state();
        let reference = &table.reference;
        state.check(reference)?;

        let stored = state.tables.get_mut(reference).ok_or_else(|| not_found(reference))?;
        if fields.contains(&"schema") {
            stored.columns = table.columns.clone();
        }
        let updated = stored.clone();
        state.updated.push(reference.clone());
        Ok(updated)
    }
}
