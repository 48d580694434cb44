//! Google OAuth2 delegated authorization and Calendar API glue.
//!
//! This crate holds everything that talks to Google:
//! - [`credentials`]: client identity loaded from a Cloud Console JSON file
//! - [`tokens`]: file-backed persistence for the current token set
//! - [`oauth`]: consent URL construction, code exchange, refresh, revocation
//! - [`session`]: the authorized state plus serialized token mutation
//! - [`calendar`]: typed passthrough to the Calendar API v3

pub mod calendar;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod session;
pub mod tokens;

pub use calendar::{CalendarClient, CalendarListEntry, Event, EventTime};
pub use credentials::ClientCredentials;
pub use error::{ErrorKind, GoogleError, GoogleResult};
pub use oauth::OAuthClient;
pub use session::AuthSession;
pub use tokens::{TokenRecord, TokenStore};
