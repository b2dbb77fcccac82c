use inflector::Inflector;
use std::collections::BTreeSet;
use crate::error::{BqSchemaError, Result};
use crate::record::{FieldType, RecordField, RecordType};
use crate::schema::{BqType, Column, FieldMode, HostType};

const DERIVES: &str = "#[derive(Debug, Clone, Serialize, Deserialize)]";

/// Build a record type from a column list. Nested records are named after
/// the column that holds them (`nested_field` -> `NestedField`), prefixed
/// with the parent record's name when that name is already taken.
pub fn to_record(name: &str, columns: &[Column]) -> Result<RecordType> {
    let name = record_name(name);
    let mut taken = BTreeSet::from([name.clone()]);
    build_record(name, columns, &mut taken)
}

fn build_record(name: String, columns: &[Column], taken: &mut BTreeSet<String>) -> Result<RecordType> {
    let mut record = RecordType::new(name);

    for column in columns {
        let base = match column.bq_type() {
            Some(BqType::Struct) => {
                let nested = nested_name(&record.name, &column.name, taken);
                FieldType::Nested(build_record(nested, &column.fields, taken)?)
            }
            Some(bq_type) => HostType::from_bq_type(bq_type)
                .map(FieldType::Scalar)
                .ok_or_else(|| BqSchemaError::UnsupportedType(column.field_type.clone()))?,
            None => return Err(BqSchemaError::UnsupportedType(column.field_type.clone())),
        };

        let field_type = match column.mode {
            FieldMode::Required => base,
            FieldMode::Nullable => FieldType::optional(base),
            FieldMode::Repeated => FieldType::repeated(base),
        };

        record.fields.push(RecordField {
            name: column.name.clone(),
            field_type,
            description: column.description.clone(),
        });
    }

    Ok(record)
}

fn nested_name(parent: &str, column: &str, taken: &mut BTreeSet<String>) -> String {
    let base = record_name(column);
    let mut candidate = base.clone();
    if taken.contains(&candidate) {
        candidate = format!("{}{}", parent, base);
    }
    let mut suffix = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}{}{}", parent, base, suffix);
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

pub fn record_name(name: &str) -> String {
    name.to_pascal_case()
}

/// Render a record type as Rust source: nested structs first, depth-first
/// in field order, then the record itself.
pub fn render_record(record: &RecordType) -> String {
    let mut blocks = Vec::new();
    collect_blocks(record, &mut blocks);
    blocks.join("\n")
}

/// Like [`render_record`], prefixed with the `use` lines the output needs.
pub fn render_module(record: &RecordType) -> String {
    let mut hosts = BTreeSet::new();
    collect_host_types(record, &mut hosts);

    let chrono_types: Vec<&str> = [
        (HostType::Date, "NaiveDate"),
        (HostType::DateTime, "NaiveDateTime"),
        (HostType::Time, "NaiveTime"),
        (HostType::Timestamp, "DateTime"),
        (HostType::Timestamp, "Utc"),
    ]
    .iter()
    .filter(|(host, _)| hosts.contains(host.as_str()))
    .map(|(_, name)| *name)
    .collect();

    let mut out = String::new();
    if !chrono_types.is_empty() {
        let mut sorted = chrono_types;
        sorted.sort_unstable();
        out.push_str(&format!("use chrono::{{{}}};\n", sorted.join(", ")));
    }
    if hosts.contains(HostType::Decimal.as_str()) {
        out.push_str("use rust_decimal::Decimal;\n");
    }
    out.push_str("use serde::{Deserialize, Serialize};\n\n");
    out.push_str(&render_record(record));
    out
}

fn collect_blocks(record: &RecordType, blocks: &mut Vec<String>) {
    for field in &record.fields {
        if let Some(nested) = nested_record(&field.field_type) {
            collect_blocks(nested, blocks);
        }
    }

    let mut block = format!("{}\npub struct {} {{\n", DERIVES, record.name);
    for field in &record.fields {
        if let Some(desc) = &field.description {
            for line in desc.lines() {
                block.push_str(&format!("    /// {}\n", line));
            }
        }
        let ident = field_ident(&field.name);
        if ident != field.name && !ident.starts_with("r#") {
            block.push_str(&format!("    #[serde(rename = \"{}\")]\n", field.name));
        }
        block.push_str(&format!("    pub {}: {},\n", ident, rust_type(&field.field_type)));
    }
    block.push_str("}\n");
    blocks.push(block);
}

// Keywords that cannot be written as raw identifiers.
const RESERVED_PATH_KEYWORDS: [&str; 4] = ["crate", "self", "Self", "super"];

const KEYWORDS: [&str; 50] = [
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield", "macro_rules", "union",
];

/// Rust identifier for a column name: raw for keywords, suffixed with `_`
/// (and serde-renamed by the caller) where a raw identifier is not allowed.
fn field_ident(name: &str) -> String {
    if RESERVED_PATH_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

fn collect_host_types(record: &RecordType, hosts: &mut BTreeSet<&'static str>) {
    for field in &record.fields {
        let mut field_type = &field.field_type;
        loop {
            match field_type {
                FieldType::Optional(inner) | FieldType::Repeated(inner) => field_type = inner.as_ref(),
                FieldType::Scalar(host) => {
                    hosts.insert(host.as_str());
                    break;
                }
                FieldType::Nested(nested) => {
                    collect_host_types(nested, hosts);
                    break;
                }
            }
        }
    }
}

fn nested_record(field_type: &FieldType) -> Option<&RecordType> {
    match field_type {
        FieldType::Nested(record) => Some(record),
        FieldType::Optional(inner) | FieldType::Repeated(inner) => nested_record(inner),
        FieldType::Scalar(_) => None,
    }
}

fn rust_type(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Scalar(host) => host.rust_type().to_string(),
        FieldType::Nested(record) => record.name.clone(),
        FieldType::Optional(inner) => format!("Option<{}>", rust_type(inner)),
        FieldType::Repeated(inner) => format!("Vec<{}>", rust_type(inner)),
    }
}
