use std::fmt;

#[derive(Debug, Clone)]
pub enum BigQueryError {
    AuthenticationFailed {
        reason: String,
        help: String,
    },

    TableNotFound {
        project: String,
        dataset: String,
        table: String,
    },

    DatasetNotFound {
        project: String,
        dataset: String,
    },

    AccessDenied {
        resource: String,
        required_permission: Option<String>,
    },

    QuotaExceeded {
        quota_type: String,
        message: String,
    },

    /// The table API rejected a schema, usually a non-additive update.
    InvalidSchema {
        table: Option<String>,
        message: String,
    },

    AlreadyExists {
        resource: String,
    },

    ConnectionFailed {
        reason: String,
    },

    InvalidCredentials {
        source: Option<String>,
        reason: String,
    },

    Unknown {
        code: Option<String>,
        message: String,
        raw_error: String,
    },
}

impl BigQueryError {
    pub fn suggestion(&self) -> String {
        match self {
            BigQueryError::AuthenticationFailed { .. } => {
                "Try:\n  \
                 • Run: gcloud auth application-default login\n  \
                 • Or set GOOGLE_SERVICE_FILE to the JSON of a service account key".to_string()
            }

            BigQueryError::TableNotFound { project, dataset, table } => {
                format!(
                    "Verify the table exists:\n  \
                     • Run: bq show {project}:{dataset}.{table}\n  \
                     • Run the migration with --apply to create it"
                )
            }

            BigQueryError::DatasetNotFound { project, dataset } => {
                format!(
                    "Create the dataset first, tables are never created without one:\n  \
                     • Run: bq mk --dataset {project}:{dataset}\n  \
                     • Or pass a different --dataset"
                )
            }

            BigQueryError::AccessDenied { resource, required_permission } => {
                let perm = required_permission.as_deref().unwrap_or("bigquery.tables.update");
                format!(
                    "Request access to {resource}:\n  \
                     • Required permission: {perm}\n  \
                     • Schema migrations usually need roles/bigquery.dataEditor"
                )
            }

            BigQueryError::QuotaExceeded { quota_type, .. } => {
                format!(
                    "Quota '{quota_type}' exceeded:\n  \
                     • Table metadata updates are rate limited per table\n  \
                     • Wait and run the migration again"
                )
            }

            BigQueryError::InvalidSchema { .. } => {
                "BigQuery only accepts additive schema changes:\n  \
                 • New columns must be NULLABLE or REPEATED\n  \
                 • Columns cannot be removed, renamed or retyped in place\n  \
                 • REQUIRED columns may only be relaxed to NULLABLE".to_string()
            }

            BigQueryError::AlreadyExists { resource } => {
                format!(
                    "{resource} already exists:\n  \
                     • Another run may have created it concurrently\n  \
                     • Re-run without --apply to see the current diff"
                )
            }

            BigQueryError::ConnectionFailed { .. } => {
                "Connection failed:\n  \
                 • Check your internet connection\n  \
                 • Verify the BigQuery API is enabled for your project".to_string()
            }

            BigQueryError::InvalidCredentials { .. } => {
                "Invalid credentials:\n  \
                 • Check that GOOGLE_SERVICE_FILE holds a complete service account key\n  \
                 • Or unset it to fall back to application default credentials".to_string()
            }

            BigQueryError::Unknown { .. } => {
                "An unexpected error occurred:\n  \
                 • Check the error message for details\n  \
                 • Check BigQuery status: https://status.cloud.google.com/".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BigQueryError::AuthenticationFailed { .. } => "AUTH_FAILED",
            BigQueryError::TableNotFound { .. } => "TABLE_NOT_FOUND",
            BigQueryError::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            BigQueryError::AccessDenied { .. } => "ACCESS_DENIED",
            BigQueryError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            BigQueryError::InvalidSchema { .. } => "INVALID_SCHEMA",
            BigQueryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            BigQueryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            BigQueryError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            BigQueryError::Unknown { .. } => "UNKNOWN",
        }
    }
}

impl fmt::Display for BigQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BigQueryError::AuthenticationFailed { reason, .. } => {
                write!(f, "Authentication failed: {reason}")
            }

            BigQueryError::TableNotFound { project, dataset, table } => {
                write!(f, "Table not found: {project}.{dataset}.{table}")
            }

            BigQueryError::DatasetNotFound { project, dataset } => {
                write!(f, "Dataset not found: {project}.{dataset}")
            }

            BigQueryError::AccessDenied { resource, required_permission } => {
                write!(f, "Access denied to {resource}")?;
                if let Some(perm) = required_permission {
                    write!(f, " (requires {perm})")?;
                }
                Ok(())
            }

            BigQueryError::QuotaExceeded { quota_type, message } => {
                write!(f, "Quota exceeded ({quota_type}): {message}")
            }

            BigQueryError::InvalidSchema { table, message } => {
                write!(f, "Invalid schema")?;
                if let Some(t) = table {
                    write!(f, " for {t}")?;
                }
                write!(f, ": {message}")
            }

            BigQueryError::AlreadyExists { resource } => {
                write!(f, "Already exists: {resource}")
            }

            BigQueryError::ConnectionFailed { reason } => {
                write!(f, "Connection failed: {reason}")
            }

            BigQueryError::InvalidCredentials { reason, source } => {
                write!(f, "Invalid credentials: {reason}")?;
                if let Some(s) = source {
                    write!(f, " (from {s})")?;
                }
                Ok(())
            }

            BigQueryError::Unknown { code, message, .. } => {
                if let Some(c) = code {
                    write!(f, "BigQuery error [{c}]: {message}")
                } else {
                    write!(f, "BigQuery error: {message}")
                }
            }
        }
    }
}

impl std::error::Error for BigQueryError {}
