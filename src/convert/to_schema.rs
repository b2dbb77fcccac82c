use crate::error::{BqSchemaError, Result};
use crate::record::{FieldType, Record, RecordField, RecordType};
use crate::schema::{BqType, Column, FieldMode};

/// Convert a record type into its column list, in declaration order.
pub fn to_schema(record: &RecordType) -> Result<Vec<Column>> {
    record.fields.iter().map(field_to_column).collect()
}

pub fn schema_of<T: Record>() -> Result<Vec<Column>> {
    to_schema(&T::record_type())
}

fn field_to_column(field: &RecordField) -> Result<Column> {
    let (mode, inner) = match &field.field_type {
        FieldType::Optional(inner) => (FieldMode::Nullable, inner.as_ref()),
        FieldType::Repeated(inner) => (FieldMode::Repeated, inner.as_ref()),
        plain => (FieldMode::Required, plain),
    };

    // wrappers only ever hold a scalar or a nested record
    let (bq_type, fields) = match inner {
        FieldType::Scalar(host) => (host.bq_type(), Vec::new()),
        FieldType::Nested(record) => (BqType::Struct, to_schema(record)?),
        FieldType::Optional(_) | FieldType::Repeated(_) => {
            return Err(BqSchemaError::UnsupportedType(field.field_type.to_string()));
        }
    };

    Ok(Column {
        name: field.name.clone(),
        field_type: bq_type.into(),
        mode,
        description: field.description.clone(),
        fields,
    })
}
