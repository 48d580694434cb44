//! Server error types.

use std::io;

use axum::http::StatusCode;
use calbridge_google::{ErrorKind, GoogleError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, token file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A Google-facing operation failed.
    #[error(transparent)]
    Google(#[from] GoogleError),

    /// A required query parameter was not supplied.
    #[error("missing query parameter: {name}")]
    MissingParam { name: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a missing parameter error.
    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParam { name: name.into() }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Maps this error to an HTTP status for the JSON endpoints.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParam { .. } => StatusCode::BAD_REQUEST,
            Self::Google(err) => match err.kind() {
                ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                ErrorKind::InvalidGrant => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::Network | ErrorKind::Api | ErrorKind::InvalidResponse => {
                    StatusCode::BAD_GATEWAY
                }
                ErrorKind::Misconfigured | ErrorKind::RevocationFailed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Io(_) | Self::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
