use rmcp::ErrorData as McpError;
use rmcp::serde_json::json;

use crate::core::utils::AVAILABLE_RESOURCES;

// Error codes
const ERROR_MISSING_CREDENTIAL: &str = "missing_credential";
const ERROR_UNAUTHORIZED: &str = "unauthorized";
const ERROR_VALIDATION: &str = "validation_error";
const ERROR_NOT_FOUND: &str = "entry_not_found";
const ERROR_API: &str = "timecamp_api_error";
const ERROR_HTTP: &str = "http_error";
const ERROR_UNEXPECTED_RESPONSE: &str = "unexpected_response";
const ERROR_PAYLOAD: &str = "payload_error";
const ERROR_CONFIG: &str = "config_error";
const ERROR_LOGGING: &str = "logging_initialization";
const ERROR_RESOURCE_NOT_FOUND: &str = "resource_not_found";

/// Custom error types for better error handling
#[derive(Debug, thiserror::Error)]
pub enum TimeCampError {
    #[error("TimeCamp API token is required")]
    MissingCredential,
    #[error("Unauthorized: no TimeCamp API token in the Authorization header or server configuration")]
    Unauthorized,
    #[error("{message}")]
    Validation { message: String },
    #[error("Time entry {entry_id} not found")]
    NotFound { entry_id: String },
    #[error("TimeCamp API request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("HTTP request failed: {message}")]
    Http { message: String },
    #[error("Unexpected TimeCamp response: {message}")]
    UnexpectedResponse { message: String },
    #[error("Invalid request payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Invalid configuration: {message}")]
    Config { message: String },
    #[error("Logging initialization failed: {0}")]
    LoggingInitialization(String),
    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl TimeCampError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TimeCampError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            message: err.to_string(),
        }
    }
}

impl From<TimeCampError> for McpError {
    fn from(err: TimeCampError) -> Self {
        let message = err.to_string();
        match err {
            TimeCampError::MissingCredential => McpError::invalid_request(
                ERROR_MISSING_CREDENTIAL,
                Some(json!({ "message": message })),
            ),
            TimeCampError::Unauthorized => {
                McpError::invalid_request(ERROR_UNAUTHORIZED, Some(json!({ "message": message })))
            }
            TimeCampError::Validation { .. } => {
                McpError::invalid_params(ERROR_VALIDATION, Some(json!({ "message": message })))
            }
            TimeCampError::NotFound { entry_id } => McpError::resource_not_found(
                ERROR_NOT_FOUND,
                Some(json!({ "entry_id": entry_id })),
            ),
            TimeCampError::Api { status, body } => McpError::internal_error(
                ERROR_API,
                Some(json!({ "status": status, "body": body })),
            ),
            TimeCampError::Http { .. } => {
                McpError::internal_error(ERROR_HTTP, Some(json!({ "message": message })))
            }
            TimeCampError::UnexpectedResponse { .. } => McpError::internal_error(
                ERROR_UNEXPECTED_RESPONSE,
                Some(json!({ "message": message })),
            ),
            TimeCampError::Payload(_) => {
                McpError::internal_error(ERROR_PAYLOAD, Some(json!({ "message": message })))
            }
            TimeCampError::Config { .. } => {
                McpError::internal_error(ERROR_CONFIG, Some(json!({ "message": message })))
            }
            TimeCampError::LoggingInitialization(_) => {
                McpError::internal_error(ERROR_LOGGING, Some(json!({ "message": message })))
            }
            TimeCampError::ResourceNotFound { uri } => McpError::resource_not_found(
                ERROR_RESOURCE_NOT_FOUND,
                Some(json!({
                    "uri": uri,
                    "available_resources": AVAILABLE_RESOURCES
                })),
            ),
        }
    }
}

pub type TimeCampResult<T> = Result<T, TimeCampError>;
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::TimeCampError;
    use crate::core::error::McpError;

    #[test]
    fn test_error_conversion() {
        let error = TimeCampError::Unauthorized;
        let mcp_error: McpError = error.into();

        assert!(mcp_error.to_string().contains("unauthorized"));
    }

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let error = TimeCampError::Api {
            status: 404,
            body: "Not Found".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("status 404"));
        assert!(message.contains("Not Found"));
    }
}
