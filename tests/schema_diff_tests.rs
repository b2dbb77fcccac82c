use bqschema::diff::{check_schemas, format_schema_differences, SchemaDiffs, TableDiff};
use bqschema::schema::{Column, FieldMode};
use bqschema::{RemoteTable, TableRef};

fn diff(local: &[Column], remote: &[Column]) -> Vec<String> {
    check_schemas(local, remote).collect()
}

fn record(mode: FieldMode, fields: Vec<Column>) -> Column {
    Column::new("a", "RECORD").with_mode(mode).with_fields(fields)
}

#[test]
fn test_identical_records() {
    let local = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER")])];
    let remote = local.clone();
    assert!(diff(&local, &remote).is_empty());
}

#[test]
fn test_new_column() {
    let local = vec![Column::new("a", "INTEGER")];
    assert_eq!(diff(&local, &[]), vec!["New column a (INTEGER, NULLABLE)"]);
}

#[test]
fn test_new_record_column_is_not_expanded() {
    let local = vec![record(FieldMode::Nullable, vec![Column::new("b", "INTEGER")])];
    assert_eq!(
        diff(&local, &[]),
        vec!["New column a (RECORD, NULLABLE) {b (INTEGER, NULLABLE)}"]
    );
}

#[test]
fn test_new_column_in_record() {
    let local = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER")])];
    let remote = vec![record(FieldMode::Required, vec![])];
    assert_eq!(diff(&local, &remote), vec!["Nested: New column b (INTEGER, NULLABLE)"]);
}

#[test]
fn test_record_mode_mismatch() {
    let local = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER")])];
    let remote = vec![record(FieldMode::Nullable, vec![Column::new("b", "INTEGER")])];
    assert_eq!(
        diff(&local, &remote),
        vec![
            "There is difference between a (RECORD, REQUIRED) {b (INTEGER, NULLABLE)} \
             and a (RECORD, NULLABLE) {b (INTEGER, NULLABLE)}"
        ]
    );
}

#[test]
fn test_nested_mode_mismatch() {
    let local = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER")])];
    let remote = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER").required()])];
    assert_eq!(
        diff(&local, &remote),
        vec!["Nested: There is difference between b (INTEGER, NULLABLE) and b (INTEGER, REQUIRED)"]
    );
}

#[test]
fn test_type_mismatch() {
    let local = vec![Column::new("a", "STRING").required()];
    let remote = vec![Column::new("a", "INTEGER").required()];
    assert_eq!(
        diff(&local, &remote),
        vec!["There is difference between a (STRING, REQUIRED) and a (INTEGER, REQUIRED)"]
    );
}

#[test]
fn test_nested_type_mismatch() {
    let local = vec![record(FieldMode::Required, vec![Column::new("b", "STRING").required()])];
    let remote = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER").required()])];
    assert_eq!(
        diff(&local, &remote),
        vec!["Nested: There is difference between b (STRING, REQUIRED) and b (INTEGER, REQUIRED)"]
    );
}

#[test]
fn test_unspecified_type() {
    let local = vec![Column::new("a", "RANDOM_FIELD_TYPE").required()];
    let remote = vec![Column::new("a", "INTEGER").required()];
    assert_eq!(
        diff(&local, &remote),
        vec!["Unspecified field type in a (RANDOM_FIELD_TYPE, REQUIRED) or a (INTEGER, REQUIRED)"]
    );
}

#[test]
fn test_unspecified_type_nested() {
    let local = vec![record(
        FieldMode::Required,
        vec![Column::new("b", "RANDOM_FIELD_TYPE").required()],
    )];
    let remote = vec![record(FieldMode::Required, vec![Column::new("b", "INTEGER").required()])];
    assert_eq!(
        diff(&local, &remote),
        vec!["Unspecified field type in b (RANDOM_FIELD_TYPE, REQUIRED) or b (INTEGER, REQUIRED)"]
    );
}

#[test]
fn test_standard_and_legacy_names_match() {
    let local = vec![
        Column::new("n", "INT64").required(),
        Column::new("s", "STRUCT").with_fields(vec![Column::new("f", "FLOAT64")]),
    ];
    let remote = vec![
        Column::new("n", "INTEGER").required(),
        Column::new("s", "RECORD").with_fields(vec![Column::new("f", "FLOAT")]),
    ];
    assert!(diff(&local, &remote).is_empty());
}

#[test]
fn test_removing_a_local_column_is_not_reported() {
    let local = vec![Column::new("kept", "STRING")];
    let remote = vec![Column::new("kept", "STRING"), Column::new("dropped", "STRING")];
    assert!(diff(&local, &remote).is_empty());
}

#[test]
fn test_format_schema_differences() {
    let mut diffs = SchemaDiffs::new();
    diffs.insert(
        "p.d.missing".to_string(),
        TableDiff::Missing {
            table: TableRef::new("p", "d", "missing"),
            local: vec![Column::new("a", "STRING")],
            partitioning: None,
        },
    );
    let local = vec![Column::new("a", "STRING"), Column::new("b", "INT64")];
    let remote = RemoteTable::new(TableRef::new("p", "d", "existing"), vec![Column::new("a", "STRING")]);
    let messages = diff(&local, &remote.columns);
    diffs.insert(
        "p.d.existing".to_string(),
        TableDiff::Existing {
            local,
            remote,
            diffs: messages,
        },
    );

    let formatted = format_schema_differences(&diffs);
    assert_eq!(formatted.len(), 2);
    assert_eq!(formatted["p.d.missing"], "Table does not exist in bq");
    assert_eq!(
        formatted["p.d.existing"],
        r#"Schema differences: ["New column b (INT64, NULLABLE)"]"#
    );
}
