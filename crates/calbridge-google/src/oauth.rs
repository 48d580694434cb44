//! OAuth 2.0 authorization-code flow against Google's endpoints.
//!
//! This is the server-side web flow: the application redirects the user to
//! Google's consent page, Google redirects back to the registered URI with
//! an authorization code, and the code is exchanged here for tokens.
//!
//! # Flow Overview
//!
//! 1. Build the authorization URL for the requested scopes
//! 2. The user grants permission; Google redirects back with a code
//! 3. Exchange the code for access and refresh tokens
//! 4. Refresh the access token when it expires
//! 5. Revoke the grant when the user disconnects

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::credentials::ClientCredentials;
use crate::error::{GoogleError, GoogleResult};
use crate::tokens::TokenRecord;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// OAuth client for Google's authorization, token, and revocation endpoints.
///
/// An explicit value constructed from [`ClientCredentials`]; there is no
/// process-wide client state.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: ClientCredentials,
    http_client: reqwest::Client,
    auth_endpoint: String,
    token_endpoint: String,
    revoke_endpoint: String,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    ///
    /// Every outbound call carries the given timeout; a slow provider
    /// surfaces as a network error instead of stalling the caller.
    pub fn new(credentials: ClientCredentials, timeout: Duration) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            http_client,
            auth_endpoint: GOOGLE_AUTH_URL.to_string(),
            token_endpoint: GOOGLE_TOKEN_URL.to_string(),
            revoke_endpoint: GOOGLE_REVOKE_URL.to_string(),
        })
    }

    /// Overrides the provider endpoints. Tests point this at a stub server.
    pub fn with_endpoints(
        mut self,
        auth: impl Into<String>,
        token: impl Into<String>,
        revoke: impl Into<String>,
    ) -> Self {
        self.auth_endpoint = auth.into();
        self.token_endpoint = token.into();
        self.revoke_endpoint = revoke.into();
        self
    }

    /// Returns the configured client credentials.
    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Builds the provider consent URL for the given scopes.
    ///
    /// Deterministic and side-effect free: the same scopes and access flag
    /// always produce the same URL. `offline_access` requests a refresh
    /// token alongside the access token.
    pub fn consent_url(&self, scopes: &[String], offline_access: bool) -> GoogleResult<Url> {
        if self.credentials.client_id.is_empty() {
            return Err(GoogleError::misconfigured("client_id is not set"));
        }

        let mut url = Url::parse(&self.auth_endpoint)
            .map_err(|e| GoogleError::misconfigured(format!("invalid authorization endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", self.credentials.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair(
                "access_type",
                if offline_access { "offline" } else { "online" },
            );

        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// Codes are single-use; callers must not retry a failed exchange with
    /// the same code. Provider-reported rejections (expired, replayed, or
    /// malformed codes) surface as [`ErrorKind::InvalidGrant`].
    ///
    /// [`ErrorKind::InvalidGrant`]: crate::error::ErrorKind::InvalidGrant
    pub async fn exchange_code(&self, code: &str) -> GoogleResult<TokenRecord> {
        let redirect_uri = self.credentials.redirect_uri.to_string();
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self.post_token_form(&params).await?;

        info!("authorization code exchanged for tokens");
        Ok(TokenRecord::new(
            response.access_token,
            response.refresh_token,
            response.token_type,
            response.expires_in,
        ))
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Google omits the refresh token from refresh responses, so the
    /// submitted one is carried into the returned record.
    pub async fn refresh_token(&self, refresh_token: &str) -> GoogleResult<TokenRecord> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&params).await?;

        let mut record = TokenRecord::new(
            response.access_token,
            response.refresh_token,
            response.token_type,
            response.expires_in,
        );
        if record.refresh_token.is_none() {
            record.refresh_token = Some(refresh_token.to_string());
        }

        info!("access token refreshed");
        Ok(record)
    }

    /// Revokes a previously issued token at the provider.
    ///
    /// Any non-success status is a [`ErrorKind::RevocationFailed`]; the
    /// call is never retried because revocation is not reliably idempotent.
    ///
    /// [`ErrorKind::RevocationFailed`]: crate::error::ErrorKind::RevocationFailed
    pub async fn revoke_token(&self, token: &str) -> GoogleResult<()> {
        let response = self
            .http_client
            .post(&self.revoke_endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GoogleError::network("revocation request timeout")
                } else {
                    GoogleError::network(format!("revocation request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::revocation_failed(format!(
                "revocation rejected ({}): {}",
                status, body
            )));
        }

        info!("token revoked");
        Ok(())
    }

    /// Sends a form request to the token endpoint and decodes the response.
    async fn post_token_form(&self, params: &[(&str, &str)]) -> GoogleResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GoogleError::network("token request timeout")
                } else {
                    GoogleError::network(format!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            debug!("token endpoint returned {}: {}", status, body);
            return Err(token_endpoint_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GoogleError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// Maps a failed token endpoint response to an error.
///
/// Google reports grant problems in the standard OAuth error body; anything
/// it names there is a rejection of the submitted code or refresh token.
fn token_endpoint_error(status: reqwest::StatusCode, body: &str) -> GoogleError {
    if let Ok(err) = serde_json::from_str::<OAuthErrorBody>(body)
        && let Some(code) = err.error
    {
        let message = match err.error_description {
            Some(desc) if !desc.is_empty() => format!("{}: {}", code, desc),
            _ => code,
        };
        return GoogleError::invalid_grant(message);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return GoogleError::rate_limited("token endpoint rate limit exceeded");
    }

    if status.is_client_error() {
        GoogleError::invalid_grant(format!("token request rejected ({}): {}", status, body))
    } else {
        GoogleError::api(format!("token endpoint error ({}): {}", status, body))
    }
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Standard OAuth error body.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client() -> OAuthClient {
        let credentials = ClientCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
            Url::parse("http://localhost:3001/callback").unwrap(),
        );
        OAuthClient::new(credentials, Duration::from_secs(5)).unwrap()
    }

    fn stubbed_client(server: &MockServer) -> OAuthClient {
        test_client().with_endpoints(
            format!("{}/auth", server.uri()),
            format!("{}/token", server.uri()),
            format!("{}/revoke", server.uri()),
        )
    }

    #[test]
    fn consent_url_contains_scopes_and_redirect() {
        let client = test_client();
        let scopes = vec![
            "https://www.googleapis.com/auth/calendar.events".to_string(),
            "openid".to_string(),
        ];
        let url = client.consent_url(&scopes, true).unwrap();

        assert!(url.as_str().starts_with(GOOGLE_AUTH_URL));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let scope = &pairs.iter().find(|(k, _)| k == "scope").unwrap().1;
        assert_eq!(
            scope,
            "https://www.googleapis.com/auth/calendar.events openid"
        );
        let redirect = &pairs.iter().find(|(k, _)| k == "redirect_uri").unwrap().1;
        assert_eq!(redirect, "http://localhost:3001/callback");
    }

    #[test]
    fn consent_url_is_deterministic() {
        let client = test_client();
        let scopes = vec!["https://www.googleapis.com/auth/calendar.events".to_string()];
        assert_eq!(
            client.consent_url(&scopes, true).unwrap(),
            client.consent_url(&scopes, true).unwrap()
        );
    }

    #[test]
    fn consent_url_access_type() {
        let client = test_client();
        let scopes = vec!["openid".to_string()];

        let offline = client.consent_url(&scopes, true).unwrap();
        assert!(offline.as_str().contains("access_type=offline"));

        let online = client.consent_url(&scopes, false).unwrap();
        assert!(online.as_str().contains("access_type=online"));
    }

    #[test]
    fn consent_url_without_client_id() {
        let credentials = ClientCredentials::new(
            "",
            "secret",
            Url::parse("http://localhost:3001/callback").unwrap(),
        );
        let client = OAuthClient::new(credentials, Duration::from_secs(5)).unwrap();
        let err = client
            .consent_url(&["openid".to_string()], true)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Misconfigured);
    }

    #[tokio::test]
    async fn exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t1",
                "refresh_token": "r1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let record = client.exchange_code("abc123").await.unwrap();
        assert_eq!(record.access_token, "t1");
        assert_eq!(record.refresh_token, Some("r1".to_string()));
        assert_eq!(record.token_type, "Bearer");
        assert!(record.expiry.is_some());
    }

    #[tokio::test]
    async fn exchange_code_replay_is_invalid_grant() {
        let server = MockServer::start().await;
        // First redemption succeeds; the provider rejects the replay.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t1",
                "expires_in": 3600
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Code was already redeemed."
            })))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        assert!(client.exchange_code("abc123").await.is_ok());

        let err = client.exchange_code("abc123").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidGrant);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn refresh_keeps_submitted_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t2",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let record = client.refresh_token("r1").await.unwrap();
        assert_eq!(record.access_token, "t2");
        assert_eq!(record.refresh_token, Some("r1".to_string()));
    }

    #[tokio::test]
    async fn refresh_with_revoked_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been revoked."
            })))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.refresh_token("r1").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidGrant);
    }

    #[tokio::test]
    async fn revoke_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token=t1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        assert!(client.revoke_token("t1").await.is_ok());
    }

    #[tokio::test]
    async fn revoke_failure_is_revocation_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_token"
            })))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.revoke_token("t1").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::RevocationFailed);
    }

    #[tokio::test]
    async fn undecodable_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.exchange_code("abc123").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidResponse);
    }
}
