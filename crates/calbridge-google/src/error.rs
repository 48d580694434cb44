//! Error types for Google-facing operations.
//!
//! Every failure that can come out of the OAuth flow or the Calendar API
//! passthrough is classified by [`ErrorKind`], which the HTTP layer maps to
//! response statuses.

use std::fmt;
use thiserror::Error;

/// High-level classification of a Google-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client credentials are missing, unreadable, or unusable.
    Misconfigured,
    /// No usable token is available; the consent flow must be (re)run.
    Unauthenticated,
    /// The provider rejected an authorization code or refresh token.
    InvalidGrant,
    /// The provider refused to revoke a token.
    RevocationFailed,
    /// Transport failure: connection, DNS resolution, timeout.
    Network,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Resource not found (404).
    NotFound,
    /// The provider returned a payload that could not be decoded.
    InvalidResponse,
    /// Any other provider-reported failure.
    Api,
}

impl ErrorKind {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Returns a stable snake_case name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Misconfigured => "misconfigured",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidGrant => "invalid_grant",
            Self::RevocationFailed => "revocation_failed",
            Self::Network => "network_error",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::InvalidResponse => "invalid_response",
            Self::Api => "api_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the OAuth flow, token persistence, or the Calendar API.
#[derive(Debug, Error)]
pub struct GoogleError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GoogleError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a misconfiguration error.
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Misconfigured, message)
    }

    /// Creates an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// Creates an invalid grant error.
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, message)
    }

    /// Creates a revocation failure error.
    pub fn revocation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RevocationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    /// Creates a generic API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized Result type for Google-facing operations.
pub type GoogleResult<T> = Result<T, GoogleError>;
