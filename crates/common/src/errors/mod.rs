//! Error types for LeadForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for run-fatal failure modes
//! - A per-record `EnrichmentFailure` that the orchestrator absorbs
//! - HTTP status code mapping and structured error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation / input errors (1xxx)
    ValidationError,
    InsufficientData,
    NoValidRecords,
    UnsupportedFileType,
    PayloadTooLarge,
    MissingSource,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    RunInProgress,

    // Rate limiting / quota (6xxx)
    RateLimited,
    QuotaExceeded,

    // External service errors (8xxx)
    UpstreamError,
    OracleUnavailable,
    EnrichmentFailed,
    SessionStoreError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InsufficientData => 1002,
            ErrorCode::NoValidRecords => 1003,
            ErrorCode::UnsupportedFileType => 1004,
            ErrorCode::PayloadTooLarge => 1005,
            ErrorCode::MissingSource => 1006,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::NotFound => 4001,

            ErrorCode::RunInProgress => 5001,

            ErrorCode::RateLimited => 6001,
            ErrorCode::QuotaExceeded => 6002,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::OracleUnavailable => 8002,
            ErrorCode::EnrichmentFailed => 8003,
            ErrorCode::SessionStoreError => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// What went wrong during a single oracle exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// No credential configured for the oracle
    Unavailable,
    /// Network-level failure (connect, TLS, body read)
    Transport(String),
    /// Oracle answered with a non-success HTTP status
    Status { status: u16, body: String },
    /// Oracle answered but the payload could not be interpreted
    Malformed(String),
    /// Oracle answered with no choices / empty content
    Empty,
    /// The call did not settle within the per-call timeout
    Timeout { timeout_ms: u64 },
}

impl FailureKind {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Unavailable => "unavailable",
            FailureKind::Transport(_) => "transport",
            FailureKind::Status { .. } => "status",
            FailureKind::Malformed(_) => "malformed",
            FailureKind::Empty => "empty",
            FailureKind::Timeout { .. } => "timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Unavailable => write!(f, "oracle credential not configured"),
            FailureKind::Transport(msg) => write!(f, "request failed: {}", msg),
            FailureKind::Status { status, body } => write!(f, "oracle error {}: {}", status, body),
            FailureKind::Malformed(msg) => write!(f, "malformed oracle response: {}", msg),
            FailureKind::Empty => write!(f, "empty oracle response"),
            FailureKind::Timeout { timeout_ms } => write!(f, "timed out after {}ms", timeout_ms),
        }
    }
}

/// Per-record enrichment failure. Always carries the company it was for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Enrichment failed for {company_name}: {kind}")]
pub struct EnrichmentFailure {
    pub company_name: String,
    pub kind: FailureKind,
}

impl EnrichmentFailure {
    pub fn new(company_name: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            company_name: company_name.into(),
            kind,
        }
    }

    /// Whether repeating the same exchange could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            FailureKind::Transport(_) | FailureKind::Timeout { .. } => true,
            FailureKind::Status { status, .. } => *status == 429 || *status >= 500,
            FailureKind::Unavailable | FailureKind::Malformed(_) | FailureKind::Empty => false,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation / input errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("File contains insufficient data (needs header row + at least one data row), found {lines} usable line(s)")]
    InsufficientData { lines: usize },

    #[error("No valid company data found in file. Please ensure your file has headers and company information.")]
    NoValidRecords {
        headers: Vec<String>,
        sample_row: Option<String>,
    },

    #[error("Unsupported file type: {message}")]
    UnsupportedFileType { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Missing input source: {message}")]
    MissingSource { input: String, message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Resource not found: {resource_type} {id}")]
    NotFound { resource_type: String, id: String },

    // Conflicts
    #[error("An enrichment run is already in progress for this user")]
    RunInProgress,

    // Rate limiting / quota
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("Free trial limit reached ({remaining} credits remaining). Please upgrade to continue.")]
    QuotaExceeded { remaining: u32 },

    // External service errors
    #[error("Enrichment service unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error(transparent)]
    Enrichment(#[from] EnrichmentFailure),

    #[error("Session store error: {message}")]
    SessionStore { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InsufficientData { .. } => ErrorCode::InsufficientData,
            AppError::NoValidRecords { .. } => ErrorCode::NoValidRecords,
            AppError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::MissingSource { .. } => ErrorCode::MissingSource,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::RunInProgress => ErrorCode::RunInProgress,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            AppError::OracleUnavailable { .. } => ErrorCode::OracleUnavailable,
            AppError::Enrichment(_) => ErrorCode::EnrichmentFailed,
            AppError::SessionStore { .. } => ErrorCode::SessionStoreError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingSource { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidToken
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 402 Payment Required
            AppError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::RunInProgress => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 415 Unsupported Media Type
            AppError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            // 422 Unprocessable Entity
            AppError::InsufficientData { .. }
            | AppError::NoValidRecords { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Enrichment(_)
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::OracleUnavailable { .. }
            | AppError::SessionStore { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Diagnostic context attached to the error response, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::NoValidRecords { headers, sample_row } => Some(serde_json::json!({
                "headers": headers,
                "sample_row": sample_row,
            })),
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            AppError::MissingSource { input, .. } => {
                Some(serde_json::json!({ "input": input }))
            }
            AppError::Enrichment(failure) => Some(serde_json::json!({
                "company_name": failure.company_name,
            })),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::SessionStore {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::InsufficientData { lines: 1 };
        assert_eq!(err.code(), ErrorCode::InsufficientData);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_no_valid_records_details() {
        let err = AppError::NoValidRecords {
            headers: vec!["a".into(), "b".into()],
            sample_row: Some(",".into()),
        };
        let details = err.details().unwrap();
        assert_eq!(details["headers"][1], "b");
        assert_eq!(details["sample_row"], ",");
    }

    #[test]
    fn test_quota_and_oracle_errors() {
        let err = AppError::QuotaExceeded { remaining: 0 };
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.code().as_code(), 6002);

        let err = AppError::OracleUnavailable {
            message: "no key".into(),
        };
        assert!(err.is_server_error());
    }

    #[test]
    fn test_failure_retryability() {
        let timeout = EnrichmentFailure::new("Acme", FailureKind::Timeout { timeout_ms: 10 });
        assert!(timeout.is_retryable());

        let throttled = EnrichmentFailure::new(
            "Acme",
            FailureKind::Status { status: 429, body: String::new() },
        );
        assert!(throttled.is_retryable());

        let bad_request = EnrichmentFailure::new(
            "Acme",
            FailureKind::Status { status: 400, body: String::new() },
        );
        assert!(!bad_request.is_retryable());
        assert!(!EnrichmentFailure::new("Acme", FailureKind::Malformed("x".into())).is_retryable());
    }

    #[test]
    fn test_failure_carries_company() {
        let err: AppError = EnrichmentFailure::new("Globex", FailureKind::Empty).into();
        assert!(err.to_string().contains("Globex"));
        assert_eq!(err.details().unwrap()["company_name"], "Globex");
    }
}
