use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::{BqSchemaError, Result};
use crate::record::{FieldType, RecordType};
use crate::schema::{Column, PartitionConfig};
use super::{SchemaSource, TableDescriptor};

const COLUMN_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]{0,299}$";

/// A table declared in a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct TableManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default, deserialize_with = "version_string")]
    pub version: Option<String>,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub partition: Option<PartitionConfig>,
    #[serde(default)]
    pub schema: Option<Vec<Column>>,
    #[serde(default)]
    pub record: Option<RecordType>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionValue {
    Number(u64),
    Text(String),
}

fn version_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<VersionValue>::deserialize(deserializer)?.map(|v| match v {
        VersionValue::Number(n) => n.to_string(),
        VersionValue::Text(s) => s,
    }))
}

impl TableManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BqSchemaError::Discovery(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let mut manifest = Self::from_yaml(&content).map_err(|e| match e {
            BqSchemaError::Discovery(msg) => {
                BqSchemaError::Discovery(format!("{}: {}", path.display(), msg))
            }
            BqSchemaError::Yaml(err) => {
                BqSchemaError::Discovery(format!("{}: {}", path.display(), err))
            }
            other => other,
        })?;
        manifest.source = Some(path.to_path_buf());
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: TableManifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.is_abstract {
            if self.schema.is_some() && self.record.is_some() {
                return Err(BqSchemaError::Discovery(
                    "'schema' and 'record' are mutually exclusive".to_string(),
                ));
            }
            return Ok(());
        }

        let name = self.name.as_deref().unwrap_or_default();
        if name.is_empty() {
            return Err(BqSchemaError::Discovery("missing table 'name'".to_string()));
        }

        let pattern = Regex::new(COLUMN_NAME_PATTERN)
            .map_err(|e| BqSchemaError::Discovery(e.to_string()))?;

        match (&self.schema, &self.record) {
            (Some(columns), None) => check_column_names(columns, &pattern),
            (None, Some(record)) => check_record_names(record, &pattern),
            (Some(_), Some(_)) => Err(BqSchemaError::Discovery(format!(
                "table '{}' declares both 'schema' and 'record'",
                name
            ))),
            (None, None) => Err(BqSchemaError::Discovery(format!(
                "table '{}' declares neither 'schema' nor 'record'",
                name
            ))),
        }
    }
}

fn check_column_names(columns: &[Column], pattern: &Regex) -> Result<()> {
    for column in columns {
        if !pattern.is_match(&column.name) {
            return Err(BqSchemaError::Discovery(format!(
                "invalid column name '{}'",
                column.name
            )));
        }
        check_column_names(&column.fields, pattern)?;
    }
    Ok(())
}

fn check_record_names(record: &RecordType, pattern: &Regex) -> Result<()> {
    for field in &record.fields {
        if !pattern.is_match(&field.name) {
            return Err(BqSchemaError::Discovery(format!(
                "invalid field name '{}' in record '{}'",
                field.name, record.name
            )));
        }

        let mut field_type = &field.field_type;
        while let FieldType::Optional(inner) | FieldType::Repeated(inner) = field_type {
            field_type = inner.as_ref();
        }
        if let FieldType::Nested(nested) = field_type {
            check_record_names(nested, pattern)?;
        }
    }
    Ok(())
}

impl TableDescriptor for TableManifest {
    fn name(&self) -> Result<&str> {
        self.name.as_deref().ok_or_else(|| self.not_implemented("name"))
    }

    fn schema(&self) -> Result<SchemaSource> {
        match (&self.schema, &self.record) {
            (Some(columns), _) => Ok(SchemaSource::Columns(columns.clone())),
            (None, Some(record)) => Ok(SchemaSource::Record(record.clone())),
            (None, None) => Err(self.not_implemented("schema")),
        }
    }

    fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn time_partitioning(&self) -> Option<PartitionConfig> {
        self.partition.clone()
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn descriptor_name(&self) -> String {
        match (&self.source, &self.name) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => "TableManifest".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldMode, PartitionType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_column_manifest() {
        let yaml = r#"
name: events
project: my-project
dataset: analytics
version: 2
partition:
  field: created_at
  type: DAY
schema:
  - name: id
    type: INT64
    mode: REQUIRED
  - name: created_at
    type: TIMESTAMP
  - name: payload
    type: RECORD
    fields:
      - name: kind
        type: STRING
"#;
        let manifest = TableManifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.full_table_name().unwrap(), "events_v2");
        assert_eq!(manifest.project(), Some("my-project"));
        assert_eq!(manifest.dataset(), Some("analytics"));

        let partition = manifest.time_partitioning().unwrap();
        assert_eq!(partition.field.as_deref(), Some("created_at"));
        assert_eq!(partition.partition_type, PartitionType::Day);

        let columns = manifest.columns().unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].mode, FieldMode::Required);
        assert_eq!(columns[1].mode, FieldMode::Nullable);
        assert_eq!(columns[2].fields[0].name, "kind");
    }

    #[test]
    fn test_parse_record_manifest() {
        let yaml = r#"
name: users
version: "1"
record:
  name: User
  fields:
    - name: id
      type: int
    - name: tags
      type:
        repeated: str
"#;
        let manifest = TableManifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.full_table_name().unwrap(), "users_v1");
        assert_eq!(
            manifest.columns().unwrap(),
            vec![
                Column::new("id", "INT64").required(),
                Column::new("tags", "STRING").repeated(),
            ]
        );
    }

    #[test]
    fn test_abstract_manifest_has_no_name() {
        let manifest = TableManifest::from_yaml("abstract: true\ndataset: shared\n").unwrap();
        assert!(manifest.is_abstract());
        assert!(matches!(
            manifest.name(),
            Err(BqSchemaError::NotImplemented { property: "name", .. })
        ));
        assert!(matches!(
            manifest.schema(),
            Err(BqSchemaError::NotImplemented { property: "schema", .. })
        ));
    }

    #[test]
    fn test_schema_and_record_are_exclusive() {
        let yaml = r#"
name: t
schema:
  - name: a
    type: STRING
record:
  name: T
  fields: []
"#;
        assert!(matches!(TableManifest::from_yaml(yaml), Err(BqSchemaError::Discovery(_))));
        assert!(matches!(
            TableManifest::from_yaml("name: t\n"),
            Err(BqSchemaError::Discovery(_))
        ));
    }

    #[test]
    fn test_invalid_column_name_rejected() {
        let yaml = r#"
name: t
schema:
  - name: 1bad
    type: STRING
"#;
        match TableManifest::from_yaml(yaml) {
            Err(BqSchemaError::Discovery(msg)) => assert!(msg.contains("1bad")),
            other => panic!("Expected Discovery error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_records_source_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name: t\nschema:\n  - name: a\n    type: STRING").unwrap();

        let manifest = TableManifest::load(file.path()).unwrap();
        assert_eq!(manifest.source.as_deref(), Some(file.path()));
        assert_eq!(manifest.descriptor_name(), file.path().display().to_string());
    }

    #[test]
    fn test_load_reports_path_on_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name: [unclosed").unwrap();

        match TableManifest::load(file.path()) {
            Err(BqSchemaError::Discovery(msg)) => {
                assert!(msg.contains(&file.path().display().to_string()))
            }
            other => panic!("Expected Discovery error, got {:?}", other),
        }
    }
}
