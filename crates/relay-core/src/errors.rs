// ABOUTME: Unified error handling with standard error codes and HTTP response mapping
// ABOUTME: Defines AppError, ErrorCode, ErrorResponse and the optional DatabaseError type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Only three kinds of failure ever reach a caller: authorization failures,
//! validation failures, and upstream generation failures. Everything that
//! happens after a reply has been streamed (classification, persistence) is
//! reported through logs only, so those paths use `DatabaseError` or their
//! own local error types and never produce an HTTP response.
//!
//! The wire body is deliberately flat: `{"error": "..."}` with an optional
//! `"details"` array for validation failures.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication & authorization
    /// Missing or mismatched tenant key, or unknown tenant
    AuthInvalid,
    /// Declared source client is not in the tenant's allow-list
    InvalidSource,

    // Validation
    /// Request body failed schema validation
    InvalidInput,

    // Rate limiting
    /// Too many requests from one client within the window
    RateLimitExceeded,

    // Resources
    /// Route or resource does not exist
    ResourceNotFound,

    // External services
    /// Generation backend failed, timed out, or returned no text
    ExternalServiceError,

    // Configuration
    /// Missing or invalid configuration
    ConfigError,

    // Internal
    /// Unexpected internal failure
    InternalError,
    /// Database statement or transaction failure
    DatabaseError,
    /// Encryption or stored-data decoding failure
    StorageError,
    /// Database or dependency is not reachable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidSource | Self::InvalidInput => 400,
            Self::AuthInvalid => 401,
            Self::ResourceNotFound => 404,
            Self::RateLimitExceeded => 429,
            Self::ExternalServiceError => 502,
            Self::ServiceUnavailable => 503,
            Self::ConfigError | Self::InternalError | Self::DatabaseError | Self::StorageError => {
                500
            }
        }
    }

    /// Get a short description of this error category
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "Authentication failed",
            Self::InvalidSource => "Source client not allowed",
            Self::InvalidInput => "Request validation failed",
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::ResourceNotFound => "Resource not found",
            Self::ExternalServiceError => "Upstream service failure",
            Self::ConfigError => "Configuration error",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::StorageError => "Storage error",
            Self::ServiceUnavailable => "Service unavailable",
        }
    }
}

/// Application error carrying a code, a caller-facing message, and optional details
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error category
    pub code: ErrorCode,
    /// Message rendered in the response body
    pub message: String,
    /// Structured details (validation issues)
    pub details: Option<serde_json::Value>,
    /// Underlying cause, logged but never rendered
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AppError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Render the underlying cause for logging
    #[must_use]
    pub fn source_message(&self) -> Option<String> {
        self.source.as_ref().map(ToString::to_string)
    }

    /// Missing, unknown, or mismatched tenant key
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::AuthInvalid, "Unauthorized")
    }

    /// Declared source label rejected; `field` is the request field name
    #[must_use]
    pub fn invalid_source(field: &str) -> Self {
        Self::new(ErrorCode::InvalidSource, format!("Invalid {field}"))
    }

    /// Request body failed validation
    #[must_use]
    pub fn validation(details: serde_json::Value) -> Self {
        Self::new(ErrorCode::InvalidInput, "Validation failed").with_details(details)
    }

    /// Generation backend failure; the message is generic on purpose
    #[must_use]
    pub fn upstream() -> Self {
        Self::new(ErrorCode::ExternalServiceError, "Upstream AI request failed")
    }

    /// Rate limit exceeded
    #[must_use]
    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::RateLimitExceeded, "Too many requests")
    }

    /// Resource not found
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorCode::ResourceNotFound, "Not Found")
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Storage (encryption/decoding) error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Caller-facing message
    pub error: String,
    /// Validation issues, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: error.message,
            details: error.details,
        }
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use super::{AppError, ErrorResponse};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::StatusCode;
    use tracing::{error, warn};

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if status.is_server_error() {
                error!(
                    code = ?self.code,
                    error = %self.message,
                    source = self.source_message().as_deref().unwrap_or(""),
                    "Request failed"
                );
            } else {
                warn!(code = ?self.code, error = %self.message, "Request rejected");
            }

            (status, Json(ErrorResponse::from(self))).into_response()
        }
    }
}

/// Errors raised by the persistence layer
#[cfg(feature = "database-errors")]
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A statement, transaction, or connection failed
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Message content could not be encrypted or decrypted
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A stored value could not be decoded
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// The row exists but belongs to another tenant
    #[error("{entity} {id} belongs to another account")]
    OwnershipConflict {
        /// Kind of row
        entity: &'static str,
        /// Row id
        id: String,
    },
}

#[cfg(feature = "database-errors")]
impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        let code = match &error {
            DatabaseError::Query(_) | DatabaseError::OwnershipConflict { .. } => {
                ErrorCode::DatabaseError
            }
            DatabaseError::Encryption(_) | DatabaseError::InvalidData(_) => {
                ErrorCode::StorageError
            }
        };
        Self::new(code, code.description()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthInvalid.http_status(), 401);
        assert_eq!(ErrorCode::InvalidSource.http_status(), 400);
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::ExternalServiceError.http_status(), 502);
        assert_eq!(ErrorCode::RateLimitExceeded.http_status(), 429);
        assert_eq!(ErrorCode::DatabaseError.http_status(), 500);
    }

    #[test]
    fn test_wire_messages() {
        assert_eq!(AppError::unauthorized().message, "Unauthorized");
        assert_eq!(
            AppError::invalid_source("sourceClient").message,
            "Invalid sourceClient"
        );
        assert_eq!(AppError::upstream().message, "Upstream AI request failed");
    }

    #[test]
    fn test_error_response_is_flat() {
        let response = ErrorResponse::from(AppError::unauthorized());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Unauthorized" }));
    }

    #[test]
    fn test_validation_response_carries_details() {
        let details = serde_json::json!([{ "path": ["message"], "message": "Message is required" }]);
        let response = ErrorResponse::from(AppError::validation(details.clone()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"], details);
    }

    #[test]
    fn test_source_is_kept_out_of_message() {
        let io = std::io::Error::other("disk on fire");
        let error = AppError::internal("Failed to store recommendation").with_source(io);
        assert_eq!(error.to_string(), "Failed to store recommendation");
        assert_eq!(error.source_message().as_deref(), Some("disk on fire"));
    }
}
