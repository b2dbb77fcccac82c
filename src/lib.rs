pub mod error;
pub mod schema;
pub mod record;
pub mod convert;
pub mod table;
pub mod discovery;
pub mod diff;
pub mod client;
pub mod migration;
pub mod row;

pub use error::{BqSchemaError, BigQueryError, Result, ValidationFailure};
pub use schema::{BqType, Column, FieldMode, HostType, PartitionConfig, PartitionType};
pub use record::{FieldType, Record, RecordField, RecordType};
pub use convert::{record_name, render_module, render_record, schema_of, to_record, to_schema};
pub use table::{RemoteTable, SchemaSource, TableDescriptor, TableKey, TableManifest, TableRef};
pub use discovery::{find_tables, register_table, TableFactory, TableFinder, TableRegistry};
pub use diff::{
    check_nested_schemas, check_schemas, format_schema_differences, print_schema_differences,
    SchemaDiff, SchemaDiffs, TableDiff,
};
pub use client::{connect, BqClient, MemoryClient, WarehouseClient};
pub use migration::{
    confirm_apply, AppliedChanges, MigrationOptions, MigrationReport, MigrationTableRow, Migrator,
    SchemaCheck, TableFailure,
};
pub use row::{decode_table_row, RowTransformer};
