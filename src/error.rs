//! Error types for submission-relay
//!
//! This module provides the error handling for the library, including:
//! - The crate-wide [`Error`] for decoding, setup and the REST adapter
//! - Step error types (Fetch, Archive, Dispatch) rendered into run reports
//! - HTTP status code mapping for the REST adapter
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for submission-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for submission-relay
///
/// Step failures have their own types ([`FetchError`], [`ArchiveError`],
/// [`DispatchError`]) and end up in the run report, never here. `Error`
/// comes from trigger decoding, setup code (configuration, database open)
/// and the REST adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "BIND_ADDRESS")
        key: Option<String>,
    },

    /// Trigger payload could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Trigger decoding errors
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The envelope is not valid JSON or has an unknown shape
    #[error("invalid notification envelope: {0}")]
    InvalidEnvelope(String),

    /// The envelope carried no records
    #[error("notification envelope contains no records")]
    EmptyBatch,

    /// An SNS HTTP message of a type other than `Notification`
    #[error("unsupported notification type {0}")]
    UnsupportedType(String),

    /// A record's message body is not a submission
    #[error("record {index} is not a valid submission message: {reason}")]
    InvalidMessage {
        /// Position of the record inside the batch
        index: usize,
        /// Why the message could not be decoded
        reason: String,
    },
}

/// Submission retrieval errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client could not be built
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request never produced a response
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The submission URL
        url: String,
        /// Transport-level reason
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// The submission URL
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// The response body could not be read to the end
    #[error("failed to read body from {url}: {reason}")]
    Body {
        /// The submission URL
        url: String,
        /// Read failure reason
        reason: String,
    },
}

/// Archive storage errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Storage credentials are missing or malformed
    #[error("invalid storage credentials: {0}")]
    Credentials(String),

    /// The storage backend refused the session
    #[error("storage authentication failed: {0}")]
    Auth(String),

    /// The object upload was rejected
    #[error("upload of {key:?} failed with HTTP {status}: {reason}")]
    Upload {
        /// Object key being written
        key: String,
        /// HTTP status returned by the backend (0 for transport failures)
        status: u16,
        /// Backend message
        reason: String,
    },

    /// Writing the object content failed
    #[error("failed to write object {key:?}: {reason}")]
    Write {
        /// Object key being written
        key: String,
        /// Write failure reason
        reason: String,
    },

    /// The writer could not be finalized
    #[error("failed to finalize object {key:?}: {reason}")]
    Finalize {
        /// Object key being written
        key: String,
        /// Finalize failure reason
        reason: String,
    },
}

/// Notification dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The send did not complete within the configured bound
    #[error("email dispatch abandoned after {after:?}")]
    TimedOut {
        /// The bound that was exceeded
        after: Duration,
    },

    /// The mail API rejected the message
    #[error("mail API returned HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The request never reached the mail API
    #[error("failed to reach mail API: {0}")]
    Transport(String),

    /// The mail API answered with an unexpected body
    #[error("unexpected mail API response: {0}")]
    InvalidResponse(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Configured audit table name is not a plain identifier
    #[error("invalid audit table name {0:?}")]
    InvalidTableName(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_envelope",
///     "message": "decode error: invalid notification envelope: expected value at line 1 column 1"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_envelope")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Decode(DecodeError::InvalidEnvelope(_)) => 400,
            Error::Decode(DecodeError::EmptyBatch) => 400,

            // 422 Unprocessable Entity - well-formed but not a submission
            Error::Decode(DecodeError::UnsupportedType(_)) => 422,
            Error::Decode(DecodeError::InvalidMessage { .. }) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Decode(e) => match e {
                DecodeError::InvalidEnvelope(_) => "invalid_envelope",
                DecodeError::EmptyBatch => "empty_batch",
                DecodeError::UnsupportedType(_) => "unsupported_type",
                DecodeError::InvalidMessage { .. } => "invalid_message",
            },
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Decode(DecodeError::InvalidMessage { index, .. }) => Some(serde_json::json!({
                "record_index": index,
            })),
            Error::Decode(DecodeError::UnsupportedType(kind)) => Some(serde_json::json!({
                "type": kind,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
