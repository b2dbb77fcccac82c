use gcp_bigquery_client::error::{BQError, ResponseError};
use super::bq_error::BigQueryError;
use regex::Regex;

pub fn parse_bq_error(error: BQError, context: ErrorContext) -> BigQueryError {
    match &error {
        BQError::ResponseError { error: resp } => parse_response_error(resp, context),

        BQError::RequestError(req_err) => {
            BigQueryError::ConnectionFailed {
                reason: req_err.to_string(),
            }
        }

        BQError::NoToken => {
            BigQueryError::AuthenticationFailed {
                reason: "No authentication token available".to_string(),
                help: "Ensure you are authenticated with GCP".to_string(),
            }
        }

        BQError::AuthError(auth_err) => {
            BigQueryError::AuthenticationFailed {
                reason: format!("{:?}", auth_err),
                help: "Check your authentication configuration".to_string(),
            }
        }

        BQError::YupAuthError(yup_err) => {
            BigQueryError::AuthenticationFailed {
                reason: yup_err.to_string(),
                help: "OAuth authentication failed".to_string(),
            }
        }

        BQError::InvalidServiceAccountKey(io_err) => {
            BigQueryError::InvalidCredentials {
                source: Some("GOOGLE_SERVICE_FILE".to_string()),
                reason: io_err.to_string(),
            }
        }

        BQError::InvalidServiceAccountAuthenticator(io_err) => {
            BigQueryError::InvalidCredentials {
                source: Some("GOOGLE_SERVICE_FILE".to_string()),
                reason: io_err.to_string(),
            }
        }

        BQError::InvalidApplicationDefaultCredentialsAuthenticator(io_err) => {
            BigQueryError::AuthenticationFailed {
                reason: io_err.to_string(),
                help: "Application default credentials are invalid or not configured".to_string(),
            }
        }

        BQError::SerializationError(serde_err) => {
            BigQueryError::Unknown {
                code: Some("SERIALIZATION".to_string()),
                message: serde_err.to_string(),
                raw_error: error.to_string(),
            }
        }

        _ => BigQueryError::Unknown {
            code: None,
            message: error.to_string(),
            raw_error: format!("{:?}", error),
        }
    }
}

fn parse_response_error(resp: &ResponseError, context: ErrorContext) -> BigQueryError {
    let status = resp.error.code;
    let message = &resp.error.message;
    let reason = resp.error.errors.first().and_then(|e| e.get("reason").map(|s| s.as_str()));

    match (status, reason) {
        (400, Some("invalid")) => BigQueryError::InvalidSchema {
            table: context.resource,
            message: message.clone(),
        },

        (403, Some("accessDenied")) => BigQueryError::AccessDenied {
            resource: context.resource.unwrap_or_else(|| "resource".to_string()),
            required_permission: extract_required_permission(message),
        },

        (403, Some("quotaExceeded")) | (403, Some("rateLimitExceeded")) => {
            BigQueryError::QuotaExceeded {
                quota_type: reason.unwrap_or("quota").to_string(),
                message: message.clone(),
            }
        }

        (404, _) => parse_not_found_error(message, &context),

        (409, _) => BigQueryError::AlreadyExists {
            resource: context.resource.unwrap_or_else(|| message.clone()),
        },

        (500..=599, _) => BigQueryError::Unknown {
            code: Some(format!("HTTP_{}", status)),
            message: format!("BigQuery server error: {}", message),
            raw_error: format!("{:?}", resp),
        },

        _ => BigQueryError::Unknown {
            code: reason.map(|s| s.to_string()),
            message: message.clone(),
            raw_error: format!("{:?}", resp),
        },
    }
}

fn parse_not_found_error(message: &str, context: &ErrorContext) -> BigQueryError {
    let msg_lower = message.to_lowercase();

    // "Not found: Dataset project:dataset" means the table check never reached the table
    if msg_lower.contains("dataset") && !msg_lower.contains("table") {
        if let Some(caps) = Regex::new(r"(?i)dataset\s+([^:\s]+):([^\s]+)")
            .ok()
            .and_then(|re| re.captures(message))
        {
            return BigQueryError::DatasetNotFound {
                project: caps[1].to_string(),
                dataset: caps[2].to_string(),
            };
        }
        if let (Some(project), Some(dataset)) = (&context.project, &context.dataset) {
            return BigQueryError::DatasetNotFound {
                project: project.clone(),
                dataset: dataset.clone(),
            };
        }
    }

    if let Some(caps) = Regex::new(r"(?i)table\s+([^:\s]+):([^.\s]+)\.([^\s]+)")
        .ok()
        .and_then(|re| re.captures(message))
    {
        return BigQueryError::TableNotFound {
            project: caps[1].to_string(),
            dataset: caps[2].to_string(),
            table: caps[3].to_string(),
        };
    }

    if let (Some(project), Some(dataset), Some(table)) =
        (&context.project, &context.dataset, &context.table)
    {
        return BigQueryError::TableNotFound {
            project: project.clone(),
            dataset: dataset.clone(),
            table: table.clone(),
        };
    }

    BigQueryError::Unknown {
        code: Some("notFound".to_string()),
        message: message.to_string(),
        raw_error: message.to_string(),
    }
}

fn extract_required_permission(message: &str) -> Option<String> {
    let perm_re = Regex::new(r"(bigquery\.[a-zA-Z.]+)").ok()?;
    perm_re
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
}

#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub resource: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub table: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    pub fn with_table(
        mut self,
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        let (project, dataset, table) = (project.into(), dataset.into(), table.into());
        self.resource = Some(format!("{}.{}.{}", project, dataset, table));
        self.project = Some(project);
        self.dataset = Some(dataset);
        self.table = Some(table);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_context() -> ErrorContext {
        ErrorContext::new()
            .with_operation("get_table")
            .with_table("proj", "ds", "events")
    }

    #[test]
    fn test_not_found_parses_table_from_message() {
        let err = parse_not_found_error("Not found: Table other:ds2.users", &table_context());
        match err {
            BigQueryError::TableNotFound { project, dataset, table } => {
                assert_eq!(project, "other");
                assert_eq!(dataset, "ds2");
                assert_eq!(table, "users");
            }
            other => panic!("Expected TableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_falls_back_to_context() {
        let err = parse_not_found_error("Not found", &table_context());
        match err {
            BigQueryError::TableNotFound { table, .. } => assert_eq!(table, "events"),
            other => panic!("Expected TableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_dataset() {
        let err = parse_not_found_error("Not found: Dataset proj:missing_ds", &table_context());
        match err {
            BigQueryError::DatasetNotFound { project, dataset } => {
                assert_eq!(project, "proj");
                assert_eq!(dataset, "missing_ds");
            }
            other => panic!("Expected DatasetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_without_context_is_unknown() {
        let err = parse_not_found_error("Not found", &ErrorContext::new());
        assert_eq!(err.error_code(), "UNKNOWN");
    }

    #[test]
    fn test_extract_required_permission() {
        let msg = "Access denied: User does not have bigquery.tables.update permission";
        assert_eq!(extract_required_permission(msg).unwrap(), "bigquery.tables.update");
    }

    #[test]
    fn test_context_resource() {
        let ctx = table_context();
        assert_eq!(ctx.resource.as_deref(), Some("proj.ds.events"));
        assert_eq!(ctx.operation.as_deref(), Some("get_table"));
    }
}
