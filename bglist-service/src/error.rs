//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::datasource::DataSourceError;
use crate::responses::ValidationError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration loaded but is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request rejected before reaching the cache or data source (400)
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    /// Backing data source cannot be reached (503)
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// Backing data source failed while answering a query (500)
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Result cache is closed; callers fall back to the query engine
    #[error("Result cache unavailable")]
    CacheUnavailable,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create a new error response with a code
    pub fn with_code(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl Error {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::DataSourceUnavailable(_) | Error::CacheUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Error::Validation(errors) => return errors.into_response(),

            Error::DataSourceUnavailable(msg) => {
                tracing::error!(kind = "unavailable", "Data source error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_code(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "DATA_SOURCE_UNAVAILABLE",
                        "The service is temporarily unavailable",
                    ),
                )
            }

            Error::DataSource(msg) => {
                tracing::error!(kind = "query", "Data source error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATA_SOURCE_ERROR",
                        "An error occurred while processing your request",
                    ),
                )
            }

            Error::CacheUnavailable => {
                tracing::error!("Result cache unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_code(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "CACHE_UNAVAILABLE",
                        "The service is temporarily unavailable",
                    ),
                )
            }

            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                internal("CONFIG_ERROR")
            }

            Error::InvalidConfig(msg) => {
                tracing::error!("Invalid configuration: {}", msg);
                internal("CONFIG_ERROR")
            }

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                internal("IO_ERROR")
            }

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal("INTERNAL_ERROR")
            }
        };

        (status, Json(error_response)).into_response()
    }
}

fn internal(code: &str) -> (StatusCode, ErrorResponse) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::with_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            "An error occurred while processing your request",
        ),
    )
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<DataSourceError> for Error {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::Unavailable(msg) => Error::DataSourceUnavailable(msg),
            other => Error::DataSource(other.to_string()),
        }
    }
}
