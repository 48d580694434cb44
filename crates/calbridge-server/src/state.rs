//! Shared application state.

use std::sync::Arc;

use calbridge_google::{
    AuthSession, CalendarClient, ClientCredentials, GoogleResult, OAuthClient, TokenRecord,
    TokenStore,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// State handed to every request handler.
///
/// The session and configuration are constructed once at startup; there is
/// no process-global client.
#[derive(Clone)]
pub struct AppState {
    /// The authorized session for the configured credential set.
    pub session: Arc<AuthSession>,
    /// The server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wraps an already-built session and configuration.
    pub fn new(session: AuthSession, config: ServerConfig) -> Self {
        Self {
            session: Arc::new(session),
            config: Arc::new(config),
        }
    }

    /// Builds the state from configuration: loads the credentials file,
    /// constructs the OAuth client, and reloads any persisted token.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let credentials = ClientCredentials::from_file(&config.credentials_path)?;
        credentials.validate()?;

        let oauth = OAuthClient::new(credentials, config.provider_timeout)?;

        let store = TokenStore::new(&config.token_path);
        match store.load() {
            Ok(true) => info!("loaded persisted token from {:?}", store.path()),
            Ok(false) => info!("no persisted token; visit /connect to authorize"),
            Err(err) => warn!("failed to load persisted token: {}", err),
        }

        Ok(Self::new(AuthSession::new(oauth, store), config))
    }

    /// Builds a calendar client carrying the given token.
    pub fn calendar_client(&self, record: &TokenRecord) -> GoogleResult<CalendarClient> {
        let client = CalendarClient::new(&record.access_token, self.config.provider_timeout)?;
        Ok(match &self.config.calendar_base_url {
            Some(base) => client.with_base_url(base.clone()),
            None => client,
        })
    }
}
