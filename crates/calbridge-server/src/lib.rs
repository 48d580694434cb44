//! HTTP surface: OAuth endpoints and calendar passthrough.
//!
//! This crate wires the Google glue into an axum application:
//! - Auth flow: /connect, /callback, /refresh, /revoke
//! - Calendar passthrough: /add-event, /calendar-list, /events, /event/{id}
//!
//! # Example
//!
//! ```rust,no_run
//! use calbridge_server::{AppState, ServerConfig, router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("credentials.json");
//!     let state = AppState::from_config(config)?;
//!     let app = router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub use config::{DEFAULT_SCOPE, ServerConfig, default_bind_addr};
pub use error::{ServerError, ServerResult};
pub use response::{ApiResponse, JsonFailure, TextFailure};
pub use routes::router;
pub use state::AppState;
