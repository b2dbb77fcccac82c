mod prompt;

use std::collections::BTreeMap;
use tabled::Tabled;
use tracing::{debug, info, warn};
use crate::client::WarehouseClient;
use crate::diff::{check_schemas, SchemaDiffs, TableDiff};
use crate::error::{BqSchemaError, Result, ValidationFailure};
use crate::table::{TableDescriptor, TableRef};

pub use prompt::{confirm_apply, CONFIRM_PROMPT, POSSIBLE_CHOICES};

/// Location overrides and run flags. `project`/`dataset` take precedence
/// over what each table declares.
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub apply: bool,
    pub validate: bool,
}

#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: BqSchemaError,
}

/// Result of checking every table against the warehouse.
#[derive(Debug, Default)]
pub struct SchemaCheck {
    pub diffs: SchemaDiffs,
    pub in_sync: Vec<String>,
    pub failures: Vec<TableFailure>,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub missing: Vec<String>,
    pub differing: Vec<String>,
    pub in_sync: Vec<String>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub failures: Vec<TableFailure>,
}

impl MigrationReport {
    pub fn new(diffs: &SchemaDiffs, in_sync: Vec<String>, failures: Vec<TableFailure>) -> Self {
        let mut report = Self {
            in_sync,
            failures,
            ..Self::default()
        };
        for (identifier, diff) in diffs {
            match diff {
                TableDiff::Missing { .. } => report.missing.push(identifier.clone()),
                TableDiff::Existing { .. } => report.differing.push(identifier.clone()),
            }
        }
        report
    }

    pub fn record_applied(&mut self, applied: AppliedChanges) {
        self.created.extend(applied.created);
        self.updated.extend(applied.updated);
        self.failures.extend(applied.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when nothing is missing or out of date.
    pub fn is_in_sync(&self) -> bool {
        self.missing.is_empty() && self.differing.is_empty()
    }

    /// One row per table touched by the run, sorted by table.
    pub fn rows(&self) -> Vec<MigrationTableRow> {
        let status = |table: &String| {
            if self.created.contains(table) {
                "created"
            } else if self.updated.contains(table) {
                "updated"
            } else if self.missing.contains(table) {
                "missing"
            } else {
                "differs"
            }
        };

        let mut rows: Vec<MigrationTableRow> = self
            .missing
            .iter()
            .chain(&self.differing)
            .map(|table| MigrationTableRow {
                table: table.clone(),
                status: status(table).to_string(),
                detail: String::new(),
            })
            .chain(self.in_sync.iter().map(|table| MigrationTableRow {
                table: table.clone(),
                status: "in sync".to_string(),
                detail: String::new(),
            }))
            .collect();

        for failure in &self.failures {
            match rows.iter_mut().find(|row| row.table == failure.table) {
                Some(row) => {
                    row.status = "failed".to_string();
                    row.detail = failure.error.to_string();
                }
                None => rows.push(MigrationTableRow {
                    table: failure.table.clone(),
                    status: "failed".to_string(),
                    detail: failure.error.to_string(),
                }),
            }
        }

        rows.sort_by(|a, b| a.table.cmp(&b.table));
        rows
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct MigrationTableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

pub struct Migrator<'a, C: WarehouseClient + ?Sized> {
    client: &'a C,
    options: MigrationOptions,
}

impl<'a, C: WarehouseClient + ?Sized> Migrator<'a, C> {
    pub fn new(client: &'a C, options: MigrationOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Check every table, apply changes when asked, and fail with the
    /// collected diagnostics when validating.
    pub async fn run(&self, tables: &[Box<dyn TableDescriptor>]) -> Result<MigrationReport> {
        let SchemaCheck { diffs, in_sync, failures } = self.find_schema_differences(tables).await;

        let mut report = MigrationReport::new(&diffs, in_sync, failures);
        if self.options.apply {
            report.record_applied(self.apply_schema_differences(&diffs).await);
        }

        if self.options.validate {
            let failure = validation_failure(&diffs, &report.failures);
            if !failure.is_empty() {
                return Err(BqSchemaError::Validation(failure));
            }
        }
        Ok(report)
    }

    /// Compare each table with its remote counterpart. Per-table errors are
    /// collected and do not stop the remaining tables.
    pub async fn find_schema_differences(&self, tables: &[Box<dyn TableDescriptor>]) -> SchemaCheck {
        let mut check = SchemaCheck::default();

        for table in tables {
            let table = table.as_ref();
            let (identifier, outcome) = match self.resolve(table) {
                Ok(reference) => (reference.to_string(), self.check_table(table, reference).await),
                Err(error) => (table_label(table), Err(error)),
            };

            match outcome {
                Ok(Some(diff)) => {
                    check.diffs.insert(identifier, diff);
                }
                Ok(None) => {
                    debug!(table = %identifier, "Table is in sync");
                    check.in_sync.push(identifier);
                }
                Err(error) => {
                    warn!(table = %identifier, error = %error, "Could not check table");
                    check.failures.push(TableFailure {
                        table: identifier,
                        error,
                    });
                }
            }
        }

        check
    }

    /// Create missing tables and push local schemas onto differing ones.
    pub async fn apply_schema_differences(&self, diffs: &SchemaDiffs) -> AppliedChanges {
        let mut applied = AppliedChanges::default();

        for (identifier, diff) in diffs {
            let (outcome, done) = match diff {
                TableDiff::Missing { table, local, partitioning } => {
                    info!(table = %identifier, "Creating table");
                    let created = self
                        .client
                        .create_table(table, local, partitioning.as_ref())
                        .await;
                    (created, &mut applied.created)
                }
                TableDiff::Existing { local, remote, .. } => {
                    info!(table = %identifier, "Updating table schema");
                    let mut target = remote.clone();
                    target.columns = local.clone();
                    let updated = self.client.update_table(&target, &["schema"]).await;
                    (updated, &mut applied.updated)
                }
            };

            match outcome {
                Ok(_) => done.push(identifier.clone()),
                Err(error) => {
                    warn!(table = %identifier, error = %error, "Could not apply changes");
                    applied.failures.push(TableFailure {
                        table: identifier.clone(),
                        error,
                    });
                }
            }
        }

        applied
    }

    pub fn resolve(&self, table: &dyn TableDescriptor) -> Result<TableRef> {
        let name = table.full_table_name()?;
        let project = self
            .options
            .project
            .as_deref()
            .or(table.project())
            .ok_or_else(|| BqSchemaError::UnresolvedLocation {
                table: name.clone(),
                missing: "Project",
            })?;
        let dataset = self
            .options
            .dataset
            .as_deref()
            .or(table.dataset())
            .ok_or_else(|| BqSchemaError::UnresolvedLocation {
                table: name.clone(),
                missing: "Dataset",
            })?;

        Ok(TableRef::new(project, dataset, name))
    }

    async fn check_table(&self, table: &dyn TableDescriptor, reference: TableRef) -> Result<Option<TableDiff>> {
        let local = table.columns()?;
        info!(table = %reference, "Checking migrations");

        match self.client.get_table(&reference).await {
            Ok(remote) => {
                let diffs: Vec<String> = check_schemas(&local, &remote.columns).collect();
                if diffs.is_empty() {
                    return Ok(None);
                }
                debug!(table = %reference, count = diffs.len(), "Schema differences found");
                Ok(Some(TableDiff::Existing { local, remote, diffs }))
            }
            Err(e) if e.is_not_found() => {
                info!(table = %reference, "Table does not exist");
                Ok(Some(TableDiff::Missing {
                    partitioning: table.time_partitioning(),
                    table: reference,
                    local,
                }))
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct AppliedChanges {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub failures: Vec<TableFailure>,
}

/// Diagnostics for a validating run. Tables that could not be checked or
/// changed count as failures too, keyed the same way as the diffs.
pub fn validation_failure(diffs: &SchemaDiffs, failures: &[TableFailure]) -> ValidationFailure {
    let mut tables: BTreeMap<String, Vec<String>> = diffs
        .iter()
        .map(|(identifier, diff)| (identifier.clone(), diff.messages()))
        .collect();

    for failure in failures {
        tables
            .entry(failure.table.clone())
            .or_default()
            .push(failure.error.to_string());
    }

    ValidationFailure { tables }
}

fn table_label(table: &dyn TableDescriptor) -> String {
    table
        .full_table_name()
        .unwrap_or_else(|_| table.descriptor_name())
}
