//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use calbridge_google::TokenStore;

use crate::error::{ServerError, ServerResult};

/// Default OAuth scope: read/write access to calendar events.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    /// Path to the Google Cloud Console credentials JSON file.
    pub credentials_path: PathBuf,

    /// Path to the persisted token file.
    pub token_path: PathBuf,

    /// OAuth scopes requested on /connect.
    pub scopes: Vec<String>,

    /// Whether to request a refresh token alongside the access token.
    pub offline_access: bool,

    /// Calendar targeted by event operations when the request does not
    /// name one.
    pub calendar_id: String,

    /// Timeout applied to every outbound provider call.
    pub provider_timeout: Duration,

    /// Override for the Calendar API base URL. Tests point this at a stub.
    pub calendar_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            credentials_path: PathBuf::from("credentials.json"),
            token_path: TokenStore::default_path(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
            offline_access: true,
            calendar_id: "primary".to_string(),
            provider_timeout: Duration::from_secs(30),
            calendar_base_url: None,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with the given credentials file path.
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            ..Default::default()
        }
    }

    /// Builder: set the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Builder: set the token file path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Builder: set the requested OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Builder: set whether offline access (a refresh token) is requested.
    pub fn with_offline_access(mut self, offline: bool) -> Self {
        self.offline_access = offline;
        self
    }

    /// Builder: set the default calendar.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Builder: set the provider call timeout.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Builder: override the Calendar API base URL.
    pub fn with_calendar_base_url(mut self, url: impl Into<String>) -> Self {
        self.calendar_base_url = Some(url.into());
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        if self.scopes.is_empty() {
            return Err(ServerError::config("at least one OAuth scope is required"));
        }
        if self.calendar_id.is_empty() {
            return Err(ServerError::config("calendar_id must not be empty"));
        }
        Ok(())
    }
}

/// Returns the default listen address, `127.0.0.1:3001`.
pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3001))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, default_bind_addr());
        assert_eq!(config.scopes, vec![DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.calendar_id, "primary");
        assert!(config.offline_access);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("/etc/calbridge/credentials.json")
            .with_bind_addr(SocketAddr::from(([0, 0, 0, 0], 8080)))
            .with_token_path("/var/lib/calbridge/tokens.json")
            .with_calendar_id("team@example.com")
            .with_provider_timeout(Duration::from_secs(10));

        assert_eq!(
            config.credentials_path,
            PathBuf::from("/etc/calbridge/credentials.json")
        );
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.calendar_id, "team@example.com");
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_scopes_fail_validation() {
        let config = ServerConfig::default().with_scopes(vec![]);
        assert!(config.validate().is_err());
    }
}
