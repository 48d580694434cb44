//! Authorized session state.
//!
//! [`AuthSession`] ties the OAuth client to the token store and owns the
//! mutex that serializes token mutation. Handlers never talk to the token
//! endpoint directly; they go through the session so two racing requests
//! cannot both redeem a code or refresh at the same time.

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{GoogleError, GoogleResult};
use crate::oauth::OAuthClient;
use crate::tokens::{TokenRecord, TokenStore};

/// The in-memory authorized state for one credential set.
///
/// State machine: unauthenticated → (code exchanged) → authenticated →
/// (access token expires) → expired → (refresh succeeds) → authenticated.
/// A failed refresh or an explicit revocation drops back to
/// unauthenticated and the consent flow must be re-run.
#[derive(Debug)]
pub struct AuthSession {
    oauth: OAuthClient,
    store: TokenStore,
    /// Serializes code exchange, refresh, and clear. One credential set per
    /// process, so a single mutex is sufficient.
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    /// Creates a session over an already-loaded token store.
    pub fn new(oauth: OAuthClient, store: TokenStore) -> Self {
        Self {
            oauth,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns the OAuth client.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Returns the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Returns true if a usable or refreshable token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.store
            .get()
            .is_some_and(|record| record.is_valid() || record.refresh_token.is_some())
    }

    /// Returns a token record that is valid right now.
    ///
    /// Returns the stored record unchanged while it is valid; otherwise
    /// refreshes it under the session mutex. The provider is never
    /// contacted when the stored record has not expired.
    pub async fn ensure_valid_token(&self) -> GoogleResult<TokenRecord> {
        if let Some(record) = self.store.get()
            && record.is_valid()
        {
            return Ok(record);
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check: another request may have refreshed while we waited.
        if let Some(record) = self.store.get()
            && record.is_valid()
        {
            return Ok(record);
        }

        let record = self.store.get().ok_or_else(|| {
            GoogleError::unauthenticated("no stored token; run the consent flow")
        })?;
        let refresh_token = record.refresh_token.ok_or_else(|| {
            GoogleError::unauthenticated("token expired and no refresh token is available")
        })?;

        debug!("stored access token expired; refreshing");
        let refreshed = self.oauth.refresh_token(&refresh_token).await?;
        self.store.set(refreshed.clone())?;
        Ok(refreshed)
    }

    /// Exchanges an authorization code and persists the resulting record.
    pub async fn exchange_and_store(&self, code: &str) -> GoogleResult<TokenRecord> {
        let _guard = self.refresh_lock.lock().await;
        let record = self.oauth.exchange_code(code).await?;
        self.store.set(record.clone())?;
        Ok(record)
    }

    /// Exchanges a caller-supplied refresh token and persists the result.
    pub async fn refresh_and_store(&self, refresh_token: &str) -> GoogleResult<TokenRecord> {
        let _guard = self.refresh_lock.lock().await;
        let record = self.oauth.refresh_token(refresh_token).await?;
        self.store.set(record.clone())?;
        Ok(record)
    }

    /// Revokes the given access token, then clears the persisted record.
    ///
    /// The store is only cleared once the provider has accepted the
    /// revocation; on failure the record stays in place.
    pub async fn revoke_and_clear(&self, access_token: &str) -> GoogleResult<()> {
        self.oauth.revoke_token(access_token).await?;
        let _guard = self.refresh_lock.lock().await;
        self.store.clear()
    }
}
