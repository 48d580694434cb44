//! Token persistence.
//!
//! The current access/refresh token material is the single source of truth
//! for "is the caller authorized". It lives in one JSON file on local disk,
//! reloaded at startup and overwritten on every exchange or refresh.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GoogleError, GoogleResult};

/// Skew subtracted from the provider-reported lifetime so tokens are
/// refreshed slightly before they actually expire.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens, when the consent
    /// flow was run with offline access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The token type reported by the provider (normally "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// When the access token expires, if the provider reported a lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Creates a record from token endpoint response data.
    ///
    /// `expires_in_secs` is converted to an absolute expiry with a small
    /// skew so the token is refreshed before the provider-side deadline.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_type: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expiry = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_SKEW_SECS));

        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: token_type.unwrap_or_else(default_token_type),
            expiry,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Records without an expiry are assumed valid.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() >= expiry,
            None => false,
        }
    }

    /// Returns true if this record can authenticate an API call right now.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// File-backed token store.
///
/// Writes go to a sibling temp file first and are renamed into place so a
/// concurrent reader never observes a partially written file.
#[derive(Debug)]
pub struct TokenStore {
    /// Path to the token file.
    path: PathBuf,

    /// In-memory copy of the current record.
    record: RwLock<Option<TokenRecord>>,
}

impl TokenStore {
    /// Creates a store backed by the given path. Call [`load`] to pick up
    /// previously persisted material.
    ///
    /// [`load`]: TokenStore::load
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: RwLock::new(None),
        }
    }

    /// Returns the default token file location,
    /// `~/.local/share/calbridge/tokens.json`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calbridge")
            .join("tokens.json")
    }

    /// Loads the persisted record from disk into memory.
    ///
    /// Returns `Ok(true)` if a record was loaded, `Ok(false)` if no file
    /// exists yet (first run).
    pub fn load(&self) -> GoogleResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            GoogleError::misconfigured(format!("failed to read token file: {}", e))
        })?;

        let record: TokenRecord = serde_json::from_str(&content).map_err(|e| {
            GoogleError::misconfigured(format!("failed to parse token file: {}", e))
        })?;

        info!("loaded token from {:?}", self.path);
        *self.record.write().unwrap() = Some(record);
        Ok(true)
    }

    /// Returns a clone of the current record, if any.
    pub fn get(&self) -> Option<TokenRecord> {
        self.record.read().unwrap().clone()
    }

    /// Replaces the current record and persists it.
    pub fn set(&self, record: TokenRecord) -> GoogleResult<()> {
        *self.record.write().unwrap() = Some(record);
        self.save()
    }

    /// Persists the current record to disk atomically.
    pub fn save(&self) -> GoogleResult<()> {
        let record = self.record.read().unwrap();
        let record = record
            .as_ref()
            .ok_or_else(|| GoogleError::misconfigured("no token to save"))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GoogleError::misconfigured(format!("failed to create token directory: {}", e))
            })?;
        }

        // Write-then-rename so readers never see a torn file.
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| GoogleError::invalid_response(format!("failed to serialize token: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            GoogleError::misconfigured(format!("failed to write token file: {}", e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            GoogleError::misconfigured(format!("failed to rename token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved token to {:?}", self.path);
        Ok(())
    }

    /// Removes the record from memory and disk.
    ///
    /// Called after a successful revocation; a later [`load`] returns
    /// absent and the consent flow must be re-run.
    ///
    /// [`load`]: TokenStore::load
    pub fn clear(&self) -> GoogleResult<()> {
        *self.record.write().unwrap() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                GoogleError::misconfigured(format!("failed to remove token file: {}", e))
            })?;
            info!("cleared token at {:?}", self.path);
        }
        Ok(())
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
