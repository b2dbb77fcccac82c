//! Conversion between warehouse rows and typed record instances.

use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::marker::PhantomData;
use crate::convert::schema_of;
use crate::error::{BqSchemaError, Result};
use crate::record::Record;
use crate::schema::{BqType, Column, FieldMode};

/// Maps rows of a table whose schema is `T`'s record type.
pub struct RowTransformer<T> {
    columns: Vec<Column>,
    _record: PhantomData<fn() -> T>,
}

impl<T> RowTransformer<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    pub fn new() -> Result<Self> {
        Ok(Self {
            columns: schema_of::<T>()?,
            _record: PhantomData,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Build an instance from a JSON object keyed by column name. Absent
    /// nullable fields read as `null`, absent repeated fields as `[]`.
    pub fn row_to_instance(&self, row: &Value) -> Result<T> {
        let normalized = normalize_object(&self.columns, row)?;
        Ok(serde_json::from_value(Value::Object(normalized))?)
    }

    /// Serialize an instance into a row, keys in column order.
    pub fn instance_to_row(&self, instance: &T) -> Result<Map<String, Value>> {
        match serde_json::to_value(instance)? {
            Value::Object(mut object) => {
                let mut row = Map::with_capacity(object.len());
                for column in &self.columns {
                    if let Some(value) = object.remove(&column.name) {
                        row.insert(column.name.clone(), value);
                    }
                }
                row.extend(object);
                Ok(row)
            }
            other => Err(BqSchemaError::Row(format!(
                "record serialized to {} instead of an object",
                json_kind(&other)
            ))),
        }
    }

    /// Decode a REST `{"f": [{"v": ...}]}` row straight into an instance.
    pub fn decode_row(&self, row: &Value) -> Result<T> {
        let decoded = decode_table_row(&self.columns, row)?;
        self.row_to_instance(&decoded)
    }
}

fn normalize_object(columns: &[Column], value: &Value) -> Result<Map<String, Value>> {
    let object = value.as_object().ok_or_else(|| {
        BqSchemaError::Row(format!("expected an object, found {}", json_kind(value)))
    })?;

    let mut normalized = Map::with_capacity(columns.len());
    for column in columns {
        let field = match object.get(&column.name) {
            None | Some(Value::Null) if column.mode == FieldMode::Repeated => Value::Array(Vec::new()),
            None | Some(Value::Null) => Value::Null,
            Some(field) => normalize_field(column, field)?,
        };
        normalized.insert(column.name.clone(), field);
    }
    Ok(normalized)
}

fn normalize_field(column: &Column, value: &Value) -> Result<Value> {
    if !column.is_struct() {
        return Ok(value.clone());
    }

    match (column.mode, value) {
        (FieldMode::Repeated, Value::Array(items)) => items
            .iter()
            .map(|item| normalize_object(&column.fields, item).map(Value::Object))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (FieldMode::Repeated, other) => Err(BqSchemaError::Row(format!(
            "column '{}' is repeated but holds {}",
            column.name,
            json_kind(other)
        ))),
        (_, object) => normalize_object(&column.fields, object).map(Value::Object),
    }
}

/// Decode a BigQuery REST row (`{"f": [{"v": ...}, ...]}`) into an object
/// keyed by column name, converting cell strings to typed JSON values.
pub fn decode_table_row(columns: &[Column], row: &Value) -> Result<Value> {
    let cells = row
        .get("f")
        .and_then(Value::as_array)
        .ok_or_else(|| BqSchemaError::Row("row has no 'f' cell list".to_string()))?;

    if cells.len() != columns.len() {
        return Err(BqSchemaError::Row(format!(
            "row has {} cells but the schema has {} columns",
            cells.len(),
            columns.len()
        )));
    }

    let mut object = Map::with_capacity(columns.len());
    for (column, cell) in columns.iter().zip(cells) {
        let value = cell.get("v").unwrap_or(&Value::Null);
        object.insert(column.name.clone(), decode_cell(column, value)?);
    }
    Ok(Value::Object(object))
}

fn decode_cell(column: &Column, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if column.mode == FieldMode::Repeated {
        let items = value.as_array().ok_or_else(|| {
            BqSchemaError::Row(format!("column '{}' is repeated but not an array", column.name))
        })?;
        return items
            .iter()
            .map(|item| decode_value(column, item.get("v").unwrap_or(&Value::Null)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array);
    }

    decode_value(column, value)
}

fn decode_value(column: &Column, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let bq_type = column.bq_type();
    if bq_type == Some(BqType::Struct) {
        return decode_table_row(&column.fields, value);
    }

    let Some(text) = value.as_str() else {
        return Ok(value.clone());
    };

    let invalid = || {
        BqSchemaError::Row(format!(
            "cannot read '{}' as {} for column '{}'",
            text, column.field_type, column.name
        ))
    };

    match bq_type {
        Some(BqType::Int64) => text.parse::<i64>().map(Value::from).map_err(|_| invalid()),
        Some(BqType::Float64) => {
            let number = text.parse::<f64>().map_err(|_| invalid())?;
            // NaN and infinities have no JSON number form
            Ok(Number::from_f64(number).map_or_else(|| value.clone(), Value::Number))
        }
        Some(BqType::Bool) => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        Some(BqType::Timestamp) => {
            let seconds = text
                .parse::<f64>()
                .ok()
                .filter(|seconds| seconds.is_finite())
                .ok_or_else(invalid)?;
            let micros = (seconds * 1_000_000.0).round() as i64;
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            DateTime::from_timestamp(micros.div_euclid(1_000_000), nanos)
                .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
                .ok_or_else(invalid)
        }
        _ => Ok(value.clone()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldType, RecordType};
    use crate::schema::HostType;
    use chrono::{NaiveDate, Utc};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        city: String,
        zip: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Customer {
        id: i64,
        name: Option<String>,
        tags: Vec<String>,
        signed_up: DateTime<Utc>,
        birthday: Option<NaiveDate>,
        address: Address,
        score: f64,
        active: bool,
    }

    impl Record for Address {
        fn record_type() -> RecordType {
            RecordType::new("Address")
                .field("city", HostType::Str)
                .field("zip", FieldType::optional(HostType::Str))
        }
    }

    impl Record for Customer {
        fn record_type() -> RecordType {
            RecordType::new("Customer")
                .field("id", HostType::Int)
                .field("name", FieldType::optional(HostType::Str))
                .field("tags", FieldType::repeated(HostType::Str))
                .field("signed_up", HostType::Timestamp)
                .field("birthday", FieldType::optional(HostType::Date))
                .field("address", FieldType::of::<Address>())
                .field("score", HostType::Float)
                .field("active", HostType::Bool)
        }
    }

    fn transformer() -> RowTransformer<Customer> {
        RowTransformer::new().unwrap()
    }

    #[test]
    fn test_row_to_instance_fills_absent_fields() {
        let row = json!({
            "id": 7,
            "signed_up": "2020-10-13T00:00:00Z",
            "address": {"city": "Berlin"},
            "score": 1.5,
            "active": true,
        });

        let customer = transformer().row_to_instance(&row).unwrap();
        assert_eq!(customer.id, 7);
        assert_eq!(customer.name, None);
        assert!(customer.tags.is_empty());
        assert_eq!(customer.address.zip, None);
    }

    #[test]
    fn test_row_to_instance_requires_object() {
        assert!(matches!(
            transformer().row_to_instance(&json!([1, 2])),
            Err(BqSchemaError::Row(_))
        ));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let row = json!({"signed_up": "2020-10-13T00:00:00Z", "address": {"city": "x"}});
        assert!(matches!(
            transformer().row_to_instance(&row),
            Err(BqSchemaError::Json(_))
        ));
    }

    #[test]
    fn test_instance_to_row_in_column_order() {
        let customer = Customer {
            id: 1,
            name: Some("Ada".into()),
            tags: vec!["vip".into()],
            signed_up: DateTime::from_timestamp(1_602_547_200, 0).unwrap(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 2),
            address: Address {
                city: "London".into(),
                zip: None,
            },
            score: 9.5,
            active: false,
        };

        let transformer = transformer();
        let row = transformer.instance_to_row(&customer).unwrap();
        let keys: Vec<_> = row.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["id", "name", "tags", "signed_up", "birthday", "address", "score", "active"]
        );
        assert_eq!(row["birthday"], json!("1990-01-02"));

        let back = transformer.row_to_instance(&Value::Object(row)).unwrap();
        assert_eq!(back, customer);
    }

    #[test]
    fn test_decode_table_row() {
        let columns = transformer().columns().to_vec();
        let row = json!({"f": [
            {"v": "42"},
            {"v": null},
            {"v": [{"v": "a"}, {"v": "b"}]},
            {"v": "1.6025472E9"},
            {"v": "1990-01-02"},
            {"v": {"f": [{"v": "Paris"}, {"v": null}]}},
            {"v": "2.25"},
            {"v": "true"},
        ]});

        let decoded = decode_table_row(&columns, &row).unwrap();
        assert_eq!(
            decoded,
            json!({
                "id": 42,
                "name": null,
                "tags": ["a", "b"],
                "signed_up": "2020-10-13T00:00:00Z",
                "birthday": "1990-01-02",
                "address": {"city": "Paris", "zip": null},
                "score": 2.25,
                "active": true,
            })
        );

        let customer = transformer().decode_row(&row).unwrap();
        assert_eq!(customer.address.city, "Paris");
        assert_eq!(customer.signed_up.timestamp(), 1_602_547_200);
    }

    #[test]
    fn test_decode_rejects_bad_cells() {
        let columns = vec![Column::new("n", "INTEGER")];
        assert!(decode_table_row(&columns, &json!({"f": [{"v": "x"}]})).is_err());
        assert!(decode_table_row(&columns, &json!({"f": []})).is_err());
        assert!(decode_table_row(&columns, &json!({"rows": []})).is_err());
    }

    #[test]
    fn test_decode_rejects_non_finite_timestamps() {
        let columns = vec![Column::new("ts", "TIMESTAMP")];
        for cell in ["NaN", "inf", "-infinity"] {
            match decode_table_row(&columns, &json!({"f": [{"v": cell}]})) {
                Err(BqSchemaError::Row(message)) => assert!(message.contains(cell)),
                other => panic!("Expected row error for {cell}, got {:?}", other),
            }
        }
    }
}
