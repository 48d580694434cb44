//! Response envelopes and failure-to-response conversion.
//!
//! Calendar operations and /revoke answer with the JSON envelope
//! `{status, message, data?}`; the auth endpoints (/connect, /callback,
//! /refresh) answer in plain text, matching what a browser shows the user
//! mid-flow.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calbridge_google::GoogleError;
use serde::Serialize;
use tracing::warn;

use crate::error::ServerError;

/// JSON envelope for the API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// "ok" or "error".
    pub status: &'static str,
    /// Human-readable outcome description.
    pub message: String,
    /// Endpoint-specific payload, omitted when there is none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A success envelope carrying a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A success envelope with no payload.
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: None,
        }
    }

    /// An error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            data: None,
        }
    }
}

/// A failure rendered as a plain-text response (auth endpoints).
///
/// Missing parameters are the caller's fault (400); everything else is a
/// provider or server failure (500).
#[derive(Debug)]
pub struct TextFailure(pub ServerError);

impl From<ServerError> for TextFailure {
    fn from(err: ServerError) -> Self {
        Self(err)
    }
}

impl From<GoogleError> for TextFailure {
    fn from(err: GoogleError) -> Self {
        Self(ServerError::Google(err))
    }
}

impl IntoResponse for TextFailure {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ServerError::MissingParam { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("auth endpoint failure: {}", self.0);
        (status, format!("Error: {}", self.0)).into_response()
    }
}

/// A failure rendered as a JSON error envelope (API endpoints).
#[derive(Debug)]
pub struct JsonFailure(pub ServerError);

impl From<ServerError> for JsonFailure {
    fn from(err: ServerError) -> Self {
        Self(err)
    }
}

impl From<GoogleError> for JsonFailure {
    fn from(err: GoogleError) -> Self {
        Self(ServerError::Google(err))
    }
}

impl IntoResponse for JsonFailure {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        warn!("api endpoint failure: {}", self.0);
        (status, Json(ApiResponse::error(self.0.to_string()))).into_response()
    }
}
