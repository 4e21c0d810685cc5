//! Persisted credential pair.

use crate::{DurableStorage, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Access and refresh token as read from storage.
///
/// A missing token is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// True when neither token is present.
    pub fn is_empty(&self) -> bool {
        self.access.is_empty() && self.refresh.is_empty()
    }

    pub fn has_access(&self) -> bool {
        !self.access.is_empty()
    }

    pub fn has_refresh(&self) -> bool {
        !self.refresh.is_empty()
    }
}

/// Token store over an injected storage backend.
///
/// Constructed once at startup and shared (behind `Arc`) by the
/// authenticated fetcher and the session controller.
pub struct TokenStore {
    storage: Box<dyn DurableStorage>,
}

impl TokenStore {
    pub fn new(storage: Box<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Read both tokens. Never fails: missing entries and read errors
    /// come back as empty strings.
    pub fn get_stored_tokens(&self) -> CredentialPair {
        CredentialPair {
            access: self.read(StorageKeys::ACCESS_TOKEN),
            refresh: self.read(StorageKeys::REFRESH_TOKEN),
        }
    }

    /// Write each token whose value is non-empty. An empty argument leaves
    /// the stored value for that slot untouched.
    pub fn store_tokens(&self, access: &str, refresh: &str) -> StorageResult<()> {
        if !access.is_empty() {
            self.storage.set(StorageKeys::ACCESS_TOKEN, access)?;
        }
        if !refresh.is_empty() {
            self.storage.set(StorageKeys::REFRESH_TOKEN, refresh)?;
        }
        debug!(
            access_written = !access.is_empty(),
            refresh_written = !refresh.is_empty(),
            "Stored tokens"
        );
        Ok(())
    }

    /// Remove both tokens. Idempotent.
    ///
    /// Both deletions are attempted; the first failure is returned.
    pub fn clear_tokens(&self) -> StorageResult<()> {
        let access = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let refresh = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        access?;
        refresh?;
        debug!("Cleared tokens");
        Ok(())
    }

    fn read(&self, key: &str) -> String {
        match self.storage.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read token, treating as absent");
                String::new()
            }
        }
    }
}
