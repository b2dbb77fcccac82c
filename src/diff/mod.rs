//! Recursive comparison of a local column list against a remote one.
//!
//! Only additive drift is reported: columns the local side declares but the
//! remote lacks, and columns whose mode or type disagree. Remote-only columns
//! are ignored. Type tags are compared after alias normalization, so
//! `INTEGER` and `INT64` are equal.

use colored::Colorize;
use std::collections::{BTreeMap, HashMap};
use std::iter::FusedIterator;
use std::slice;
use crate::schema::{Column, PartitionConfig};
use crate::table::{RemoteTable, TableRef};

pub const TABLE_MISSING: &str = "Table does not exist in bq";

const NESTED_PREFIX: &str = "Nested: ";

/// Compare two top-level column lists.
pub fn check_schemas<'a>(local: &'a [Column], remote: &'a [Column]) -> SchemaDiff<'a> {
    SchemaDiff::new(local, remote, false)
}

/// Compare the children of a STRUCT column; messages carry the `Nested: ` prefix.
pub fn check_nested_schemas<'a>(local: &'a [Column], remote: &'a [Column]) -> SchemaDiff<'a> {
    SchemaDiff::new(local, remote, true)
}

/// Lazy sequence of difference messages, in local column order with nested
/// differences yielded at the position of their parent column.
pub struct SchemaDiff<'a> {
    stack: Vec<Frame<'a>>,
}

struct Frame<'a> {
    local: slice::Iter<'a, Column>,
    remote: HashMap<&'a str, &'a Column>,
    nested: bool,
}

impl<'a> Frame<'a> {
    fn new(local: &'a [Column], remote: &'a [Column], nested: bool) -> Self {
        // duplicate remote names: last one wins
        let remote = remote.iter().map(|c| (c.name.as_str(), c)).collect();
        Self {
            local: local.iter(),
            remote,
            nested,
        }
    }
}

impl<'a> SchemaDiff<'a> {
    fn new(local: &'a [Column], remote: &'a [Column], nested: bool) -> Self {
        Self {
            stack: vec![Frame::new(local, remote, nested)],
        }
    }
}

impl Iterator for SchemaDiff<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(local) = frame.local.next() else {
                self.stack.pop();
                continue;
            };
            let prefix = if frame.nested { NESTED_PREFIX } else { "" };

            let Some(remote) = frame.remote.get(local.name.as_str()).copied() else {
                return Some(format!("{}New column {}", prefix, local));
            };

            let (Some(local_type), Some(remote_type)) = (local.bq_type(), remote.bq_type()) else {
                return Some(format!("Unspecified field type in {} or {}", local, remote));
            };

            if local.mode != remote.mode || local_type != remote_type {
                return Some(format!(
                    "{}There is difference between {} and {}",
                    prefix, local, remote
                ));
            }

            if local_type.is_struct() {
                self.stack.push(Frame::new(&local.fields, &remote.fields, true));
            }
        }
    }
}

impl FusedIterator for SchemaDiff<'_> {}

/// Outcome of comparing one local table against the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDiff {
    Missing {
        table: TableRef,
        local: Vec<Column>,
        partitioning: Option<PartitionConfig>,
    },
    Existing {
        local: Vec<Column>,
        remote: RemoteTable,
        diffs: Vec<String>,
    },
}

impl TableDiff {
    pub fn table(&self) -> &TableRef {
        match self {
            TableDiff::Missing { table, .. } => table,
            TableDiff::Existing { remote, .. } => &remote.reference,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, TableDiff::Missing { .. })
    }

    pub fn local(&self) -> &[Column] {
        match self {
            TableDiff::Missing { local, .. } | TableDiff::Existing { local, .. } => local,
        }
    }

    /// Diagnostic lines for validation output.
    pub fn messages(&self) -> Vec<String> {
        match self {
            TableDiff::Missing { .. } => vec![TABLE_MISSING.to_string()],
            TableDiff::Existing { diffs, .. } => diffs.clone(),
        }
    }
}

/// Actionable differences keyed by `project.dataset.table`.
pub type SchemaDiffs = BTreeMap<String, TableDiff>;

pub fn format_schema_differences(diffs: &SchemaDiffs) -> BTreeMap<String, String> {
    diffs
        .iter()
        .map(|(identifier, diff)| {
            let text = match diff {
                TableDiff::Missing { .. } => TABLE_MISSING.to_string(),
                TableDiff::Existing { diffs, .. } => format!("Schema differences: {:?}", diffs),
            };
            (identifier.clone(), text)
        })
        .collect()
}

pub fn print_schema_differences(diffs: &SchemaDiffs) {
    if diffs.is_empty() {
        println!("{}", "All tables are in sync".green());
        return;
    }

    for (identifier, diff) in diffs {
        match diff {
            TableDiff::Missing { local, .. } => {
                println!("{} {}", "+".green().bold(), identifier.bold());
                println!("  {}", TABLE_MISSING.yellow());
                println!("  {}", format!("{} column(s) will be created", local.len()).dimmed());
            }
            TableDiff::Existing { diffs, .. } => {
                println!("{} {}", "~".yellow().bold(), identifier.bold());
                for message in diffs {
                    println!("  {} {}", "-".dimmed(), message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldMode;

    fn diff(local: &[Column], remote: &[Column]) -> Vec<String> {
        check_schemas(local, remote).collect()
    }

    #[test]
    fn test_identical_schemas_have_no_diff() {
        let schema = vec![
            Column::new("id", "INT64").required(),
            Column::new("payload", "STRUCT")
                .with_fields(vec![Column::new("kind", "STRING").repeated()]),
        ];
        assert!(diff(&schema, &schema).is_empty());
    }

    #[test]
    fn test_new_nested_column() {
        let local = vec![Column::new("a", "RECORD")
            .required()
            .with_fields(vec![Column::new("b", "INTEGER")])];
        let remote = vec![Column::new("a", "RECORD").required()];

        assert_eq!(diff(&local, &remote), vec!["Nested: New column b (INTEGER, NULLABLE)"]);
    }

    #[test]
    fn test_type_mismatch_reports_once() {
        let local = vec![Column::new("a", "STRING").required()];
        let remote = vec![Column::new("a", "INTEGER").required()];

        assert_eq!(
            diff(&local, &remote),
            vec!["There is difference between a (STRING, REQUIRED) and a (INTEGER, REQUIRED)"]
        );
    }

    #[test]
    fn test_mode_mismatch() {
        let local = vec![Column::new("a", "STRING").repeated()];
        let remote = vec![Column::new("a", "STRING")];
        assert_eq!(diff(&local, &remote).len(), 1);
        assert!(diff(&local, &remote)[0].starts_with("There is difference between"));
    }

    #[test]
    fn test_legacy_aliases_are_equal() {
        let local = vec![
            Column::new("a", "INT64"),
            Column::new("b", "FLOAT64"),
            Column::new("c", "BOOL"),
            Column::new("d", "STRUCT").with_fields(vec![Column::new("e", "NUMERIC")]),
        ];
        let remote = vec![
            Column::new("a", "INTEGER"),
            Column::new("b", "FLOAT"),
            Column::new("c", "BOOLEAN"),
            Column::new("d", "RECORD").with_fields(vec![Column::new("e", "DECIMAL")]),
        ];
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn test_remote_only_columns_ignored() {
        let local = vec![Column::new("a", "STRING")];
        let remote = vec![Column::new("a", "STRING"), Column::new("legacy", "STRING")];
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn test_mismatched_struct_does_not_recurse() {
        let local = vec![Column::new("a", "STRUCT")
            .required()
            .with_fields(vec![Column::new("b", "STRING")])];
        let remote = vec![Column::new("a", "STRUCT").with_fields(vec![])];

        let messages = diff(&local, &remote);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("There is difference between a (STRUCT, REQUIRED)"));
    }

    #[test]
    fn test_unknown_tag_is_unspecified() {
        let local = vec![Column::new("a", "STRING")];
        let remote = vec![Column::new("a", "RANGE")];
        assert_eq!(
            diff(&local, &remote),
            vec!["Unspecified field type in a (STRING, NULLABLE) or a (RANGE, NULLABLE)"]
        );
    }

    #[test]
    fn test_unspecified_type_has_no_nested_prefix() {
        let local = vec![Column::new("s", "STRUCT").with_fields(vec![Column::new("x", "WAT")])];
        let remote = vec![Column::new("s", "RECORD").with_fields(vec![Column::new("x", "STRING")])];
        assert_eq!(
            diff(&local, &remote),
            vec!["Unspecified field type in x (WAT, NULLABLE) or x (STRING, NULLABLE)"]
        );
    }

    #[test]
    fn test_nested_mismatch_has_prefix() {
        let local = vec![Column::new("s", "STRUCT")
            .with_fields(vec![Column::new("x", "STRING").with_mode(FieldMode::Required)])];
        let remote = vec![Column::new("s", "STRUCT").with_fields(vec![Column::new("x", "STRING")])];
        assert_eq!(
            diff(&local, &remote),
            vec!["Nested: There is difference between x (STRING, REQUIRED) and x (STRING, NULLABLE)"]
        );
    }

    #[test]
    fn test_messages_follow_local_order_with_nested_in_place() {
        let local = vec![
            Column::new("first", "STRING"),
            Column::new("s", "STRUCT").with_fields(vec![Column::new("inner", "INT64")]),
            Column::new("last", "STRING"),
        ];
        let remote = vec![Column::new("s", "STRUCT")];

        assert_eq!(
            diff(&local, &remote),
            vec![
                "New column first (STRING, NULLABLE)",
                "Nested: New column inner (INT64, NULLABLE)",
                "New column last (STRING, NULLABLE)",
            ]
        );
    }

    #[test]
    fn test_duplicate_remote_names_last_wins() {
        let local = vec![Column::new("a", "INT64")];
        let remote = vec![Column::new("a", "STRING"), Column::new("a", "INTEGER")];
        assert!(diff(&local, &remote).is_empty());
    }

    #[test]
    fn test_check_nested_schemas_prefixes_new_columns() {
        let local = vec![Column::new("a", "STRING")];
        let messages: Vec<_> = check_nested_schemas(&local, &[]).collect();
        assert_eq!(messages, vec!["Nested: New column a (STRING, NULLABLE)"]);
    }

    #[test]
    fn test_diff_is_lazy() {
        let local = vec![Column::new("a", "STRING"), Column::new("b", "STRING")];
        let mut iter = check_schemas(&local, &[]);
        assert_eq!(iter.next().as_deref(), Some("New column a (STRING, NULLABLE)"));
        assert_eq!(iter.next().as_deref(), Some("New column b (STRING, NULLABLE)"));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_format_schema_differences() {
        let table = TableRef::new("p", "d", "events");
        let mut diffs = SchemaDiffs::new();
        diffs.insert(
            "p.d.events".to_string(),
            TableDiff::Missing {
                table: table.clone(),
                local: vec![],
                partitioning: None,
            },
        );
        diffs.insert(
            "p.d.users".to_string(),
            TableDiff::Existing {
                local: vec![],
                remote: RemoteTable::new(TableRef::new("p", "d", "users"), vec![]),
                diffs: vec!["New column a (STRING, NULLABLE)".to_string()],
            },
        );

        let formatted = format_schema_differences(&diffs);
        assert_eq!(formatted["p.d.events"], "Table does not exist in bq");
        assert_eq!(
            formatted["p.d.users"],
            r#"Schema differences: ["New column a (STRING, NULLABLE)"]"#
        );
        assert_eq!(diffs["p.d.events"].table(), &table);
        assert_eq!(diffs["p.d.events"].messages(), vec![TABLE_MISSING]);
    }
}
