use async_trait::async_trait;
use gcp_bigquery_client::Client;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::field_type::FieldType;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::model::time_partitioning::TimePartitioning;
use gcp_bigquery_client::yup_oauth2::ServiceAccountKey;
use tracing::debug;
use crate::error::{parse_bq_error, BqSchemaError, ErrorContext, Result};
use crate::schema::{BqType, Column, FieldMode, PartitionConfig, PartitionType};
use super::{RemoteTable, TableRef, WarehouseClient};

/// Environment variable holding the JSON text of a service account key.
pub const SERVICE_FILE_ENV: &str = "GOOGLE_SERVICE_FILE";

#[derive(Clone)]
pub struct BqClient {
    client: Client,
    default_project: Option<String>,
}

/// Build a client from `GOOGLE_SERVICE_FILE` when set, else from
/// application default credentials.
pub async fn connect() -> Result<BqClient> {
    match std::env::var(SERVICE_FILE_ENV) {
        Ok(json) if !json.trim().is_empty() => BqClient::from_service_account_json(&json).await,
        _ => BqClient::from_application_default_credentials().await,
    }
}

impl BqClient {
    pub async fn from_application_default_credentials() -> Result<Self> {
        debug!("Connecting with application default credentials");
        let client = Client::from_application_default_credentials()
            .await
            .map_err(init_error)?;

        Ok(Self {
            client,
            default_project: None,
        })
    }

    pub async fn from_service_account_json(json: &str) -> Result<Self> {
        let sa_key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
            BqSchemaError::Client(format!(
                "{} does not hold a valid service account key: {}",
                SERVICE_FILE_ENV, e
            ))
        })?;
        let default_project = sa_key.project_id.clone();
        debug!(project = ?default_project, "Connecting with service account key");

        let client = Client::from_service_account_key(sa_key, false)
            .await
            .map_err(init_error)?;

        Ok(Self {
            client,
            default_project,
        })
    }

    /// Project named by the service account key, if any.
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }

    fn context(operation: &str, table: &TableRef) -> ErrorContext {
        ErrorContext::new()
            .with_operation(operation)
            .with_table(&table.project, &table.dataset, &table.table)
    }
}

fn init_error(err: BQError) -> BqSchemaError {
    let ctx = ErrorContext::new().with_operation("client_init");
    BqSchemaError::BigQuery(parse_bq_error(err, ctx))
}

#[async_trait]
impl WarehouseClient for BqClient {
    async fn get_table(&self, table: &TableRef) -> Result<RemoteTable> {
        let remote = self
            .client
            .table()
            .get(&table.project, &table.dataset, &table.table, None)
            .await
            .map_err(|e| BqSchemaError::BigQuery(parse_bq_error(e, Self::context("get_table", table))))?;

        Ok(from_table(table.clone(), &remote))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        columns: &[Column],
        partitioning: Option<&PartitionConfig>,
    ) -> Result<RemoteTable> {
        let mut bq_table = Table::new(
            &table.project,
            &table.dataset,
            &table.table,
            build_table_schema(columns)?,
        );
        bq_table.time_partitioning = partitioning.map(build_time_partitioning);

        let created = self
            .client
            .table()
            .create(bq_table)
            .await
            .map_err(|e| {
                BqSchemaError::BigQuery(parse_bq_error(e, Self::context("create_table", table)))
            })?;

        Ok(from_table(table.clone(), &created))
    }

    async fn update_table(&self, table: &RemoteTable, fields: &[&str]) -> Result<RemoteTable> {
        if let Some(unsupported) = fields.iter().find(|f| **f != "schema") {
            return Err(BqSchemaError::Client(format!(
                "Updating '{}' of {} is not supported",
                unsupported, table.reference
            )));
        }

        let reference = &table.reference;
        let patch = Table::new(
            &reference.project,
            &reference.dataset,
            &reference.table,
            build_table_schema(&table.columns)?,
        );

        let updated = self
            .client
            .table()
            .patch(&reference.project, &reference.dataset, &reference.table, patch)
            .await
            .map_err(|e| {
                BqSchemaError::BigQuery(parse_bq_error(e, Self::context("update_table", reference)))
            })?;

        Ok(from_table(reference.clone(), &updated))
    }
}

fn build_table_schema(columns: &[Column]) -> Result<TableSchema> {
    let fields = columns
        .iter()
        .map(build_field_schema)
        .collect::<Result<Vec<_>>>()?;

    Ok(TableSchema { fields: Some(fields) })
}

fn build_field_schema(column: &Column) -> Result<TableFieldSchema> {
    let bq_type = column
        .bq_type()
        .ok_or_else(|| BqSchemaError::UnsupportedType(column.field_type.clone()))?;

    let mut tfs = TableFieldSchema::new(&column.name, to_field_type(bq_type));
    tfs.mode = Some(column.mode.as_str().to_string());

    if let Some(desc) = &column.description {
        tfs.description = Some(desc.clone());
    }

    if !column.fields.is_empty() {
        tfs.fields = Some(
            column
                .fields
                .iter()
                .map(build_field_schema)
                .collect::<Result<Vec<_>>>()?,
        );
    }

    Ok(tfs)
}

fn to_field_type(bq_type: BqType) -> FieldType {
    match bq_type {
        BqType::String => FieldType::String,
        BqType::Bytes => FieldType::Bytes,
        BqType::Int64 => FieldType::Int64,
        BqType::Float64 => FieldType::Float64,
        BqType::Numeric => FieldType::Numeric,
        BqType::Bignumeric => FieldType::Bignumeric,
        BqType::Bool => FieldType::Bool,
        BqType::Date => FieldType::Date,
        BqType::Datetime => FieldType::Datetime,
        BqType::Time => FieldType::Time,
        BqType::Timestamp => FieldType::Timestamp,
        BqType::Geography => FieldType::Geography,
        BqType::Json => FieldType::Json,
        BqType::Struct => FieldType::Struct,
    }
}

/// Tag as BigQuery spells it, legacy names included.
fn field_type_tag(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::String => "STRING",
        FieldType::Bytes => "BYTES",
        FieldType::Integer => "INTEGER",
        FieldType::Int64 => "INT64",
        FieldType::Float => "FLOAT",
        FieldType::Float64 => "FLOAT64",
        FieldType::Numeric => "NUMERIC",
        FieldType::Bignumeric => "BIGNUMERIC",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Bool => "BOOL",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Date => "DATE",
        FieldType::Time => "TIME",
        FieldType::Datetime => "DATETIME",
        FieldType::Record => "RECORD",
        FieldType::Struct => "STRUCT",
        FieldType::Geography => "GEOGRAPHY",
        FieldType::Json => "JSON",
        FieldType::Interval => "INTERVAL",
    }
}

fn from_field_schema(tfs: &TableFieldSchema) -> Column {
    let mode = tfs
        .mode
        .as_deref()
        .and_then(FieldMode::from_tag)
        .unwrap_or_default();

    Column {
        name: tfs.name.clone(),
        field_type: field_type_tag(&tfs.r#type).to_string(),
        mode,
        description: tfs.description.clone(),
        fields: tfs
            .fields
            .as_ref()
            .map(|fields| fields.iter().map(from_field_schema).collect())
            .unwrap_or_default(),
    }
}

fn build_time_partitioning(config: &PartitionConfig) -> TimePartitioning {
    let mut tp = TimePartitioning::default();
    tp.r#type = config.partition_type.as_str().to_string();
    tp.field = config.field.clone();
    tp.expiration_ms = config.expiration_ms.map(|ms| ms.to_string());
    tp.require_partition_filter = config.require_partition_filter;
    tp
}

fn from_time_partitioning(tp: &TimePartitioning) -> PartitionConfig {
    PartitionConfig {
        field: tp.field.clone(),
        partition_type: PartitionType::from_tag(&tp.r#type).unwrap_or_default(),
        expiration_ms: tp.expiration_ms.as_deref().and_then(|ms| ms.parse().ok()),
        require_partition_filter: tp.require_partition_filter,
    }
}

fn from_table(reference: TableRef, table: &Table) -> RemoteTable {
    let columns = table
        .schema
        .fields
        .as_ref()
        .map(|fields| fields.iter().map(from_field_schema).collect())
        .unwrap_or_default();

    RemoteTable::new(reference, columns)
        .with_partitioning(table.time_partitioning.as_ref().map(from_time_partitioning))
}
