// HTTP API Error Types
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::api::format::RecordError;
use crate::database::manager::DatabaseError;
use crate::filter::FilterError;
use crate::integrations::TelegramError;
use crate::render::RenderError;
use crate::services::{AssemblyError, CertificateError};
use crate::types::{UnknownLanguage, UnknownResource};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),
    InvalidLanguage(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (renderer, Telegram)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::InvalidLanguage(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::InvalidLanguage(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::InvalidLanguage(_) => "INVALID_LANGUAGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation error pointing at a single field
    pub fn field_error(
        message: impl Into<String>,
        field: &str,
        problem: impl Into<String>,
    ) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), problem.into());
        Self::validation_error(message, Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotAnObject => {
                ApiError::invalid_json("Request body must be a JSON object")
            }
            RecordError::MissingRequiredField(field) => {
                ApiError::field_error("Missing required fields", field, "This field is required")
            }
            RecordError::InvalidField { field, expected } => {
                let problem = format!("Must be {}", expected);
                ApiError::field_error("Invalid field format", field, problem)
            }
            RecordError::InvalidPayload(field) => {
                ApiError::field_error("Invalid field format", field, "Invalid base64 payload")
            }
            err @ RecordError::UidMismatch { .. } => ApiError::bad_request(err.to_string()),
            err @ RecordError::Malformed { .. } => {
                ApiError::validation_error(err.to_string(), None)
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(_)
            | DatabaseError::InvalidDatabaseUrl
            | DatabaseError::InvalidPartitionName(_) => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Decode(msg) => {
                tracing::error!("Stored document could not be decoded: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<UnknownLanguage> for ApiError {
    fn from(err: UnknownLanguage) -> Self {
        ApiError::InvalidLanguage(err.to_string())
    }
}

impl From<UnknownResource> for ApiError {
    fn from(err: UnknownResource) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<AssemblyError> for ApiError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::InvalidLanguage(e) => e.into(),
            AssemblyError::NotFound(uid) => {
                ApiError::not_found(format!("Program not found: {}", uid))
            }
            AssemblyError::DanglingReference { collection, uid } => {
                tracing::error!("Program references missing {} '{}'", collection, uid);
                ApiError::internal_server_error("Program content is incomplete")
            }
            AssemblyError::Storage(e) => {
                tracing::error!("Program assembly failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AssemblyError::Timeout(after) => {
                tracing::error!("Program assembly timed out after {:?}", after);
                ApiError::internal_server_error("Request processing timed out")
            }
        }
    }
}

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::Validation(msg) => ApiError::validation_error(msg, None),
            CertificateError::UnsupportedLanguage(e) => e.into(),
            CertificateError::AlreadyIssued(id) => {
                ApiError::conflict(format!("Certificate already issued: {}", id))
            }
            CertificateError::NotFound(id) => {
                ApiError::not_found(format!("Certificate not found: {}", id))
            }
            CertificateError::Storage(e) => e.into(),
            CertificateError::Render(e) => e.into(),
            CertificateError::Io(e) => {
                tracing::error!("Certificate file write failed: {}", e);
                ApiError::internal_server_error("Failed to store certificate file")
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::UnsupportedFormat(f) => {
                ApiError::bad_request(format!("Unsupported output format: {}", f))
            }
            other => {
                tracing::error!("Certificate rendering failed: {}", other);
                ApiError::bad_gateway("Certificate rendering failed")
            }
        }
    }
}

impl From<TelegramError> for ApiError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Validation(msg) => ApiError::validation_error(msg, None),
            TelegramError::NotConfigured => {
                ApiError::service_unavailable("Telegram delivery is not configured")
            }
            TelegramError::Transport(e) => {
                tracing::error!("Telegram request failed: {}", e);
                ApiError::bad_gateway("Telegram is unreachable")
            }
            TelegramError::Rejected(description) => {
                ApiError::bad_gateway(format!("Telegram rejected the document: {}", description))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
