//! Client identity loaded from a Google Cloud Console credentials file.
//!
//! The service authenticates as a registered OAuth2 application; users supply
//! the JSON downloaded from the Cloud Console credentials page. The file is
//! read once at startup and the resulting [`ClientCredentials`] value is
//! immutable for the process lifetime.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{GoogleError, GoogleResult};

/// OAuth 2.0 client identity: id, secret, and the redirect URI registered
/// with the provider.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// The OAuth 2.0 client ID from the Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from the Google Cloud Console.
    pub client_secret: String,
    /// The redirect URI the provider sends the authorization code to.
    pub redirect_uri: Url,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports the Cloud Console format with a "web" or "installed" section
/// (redirect URIs nested inside), and a flat format with `client_id`,
/// `client_secret`, and `redirect_uri` at the root level.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    web: Option<NestedCredentials>,
    installed: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

/// Credentials within a nested section of the JSON file.
#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientCredentials {
    /// Creates new client credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GoogleResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GoogleError::misconfigured(format!(
                "failed to read credentials file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| GoogleError::misconfigured(format!("failed to parse credentials JSON: {}", e)))?;

        // Nested format first: web applications, then installed (desktop).
        if let Some(creds) = file.web.or(file.installed) {
            let redirect = creds.redirect_uris.first().ok_or_else(|| {
                GoogleError::misconfigured("credentials section has no redirect_uris entry")
            })?;
            return Ok(Self::new(
                creds.client_id.clone(),
                creds.client_secret.clone(),
                parse_redirect_uri(redirect)?,
            ));
        }

        // Flat format: everything at the root level.
        if let (Some(client_id), Some(client_secret), Some(redirect)) =
            (file.client_id, file.client_secret, file.redirect_uri)
        {
            return Ok(Self::new(
                client_id,
                client_secret,
                parse_redirect_uri(&redirect)?,
            ));
        }

        Err(GoogleError::misconfigured(
            "credentials file must contain a 'web'/'installed' section or \
             'client_id'/'client_secret'/'redirect_uri' at the root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> GoogleResult<()> {
        if self.client_id.is_empty() {
            return Err(GoogleError::misconfigured("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(GoogleError::misconfigured(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(GoogleError::misconfigured("client_secret is required"));
        }
        Ok(())
    }
}

fn parse_redirect_uri(raw: &str) -> GoogleResult<Url> {
    Url::parse(raw)
        .map_err(|e| GoogleError::misconfigured(format!("invalid redirect URI {:?}: {}", raw, e)))
}
