//! System keychain token store
//!
//! Uses the OS keychain for secure token storage:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;
use tracing::{debug, warn};

use super::traits::{StoreError, StoreResult, Token, TokenStore};
use crate::config::KEYCHAIN_SERVICE;

/// Token store backed by the system keychain
///
/// Every token lives under one service name (default `xbe-cli`) with the
/// account `token:<normalized-base-url>`.
///
/// # Example
///
/// ```no_run
/// use xbe_auth::secrets::{KeychainTokenStore, Token, TokenStore};
///
/// let store = KeychainTokenStore::new();
/// store.set("https://app.x-b-e.com", &Token::new("tok-..."))?;
/// let token = store.get("https://app.x-b-e.com")?;
/// # Ok::<(), xbe_auth::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service_name: String,
}

impl KeychainTokenStore {
    /// Create a keychain store with the default service name
    pub fn new() -> Self {
        Self::with_service(KEYCHAIN_SERVICE)
    }

    /// Create a keychain store with a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Keychain account name for a lookup key
    pub fn account(key: &str) -> String {
        format!("token:{}", key)
    }

    fn entry(&self, key: &str) -> StoreResult<Entry> {
        Entry::new(&self.service_name, &Self::account(key)).map_err(StoreError::Keychain)
    }

    fn map_error(key: &str, err: keyring::Error) -> StoreError {
        match err {
            keyring::Error::NoEntry => StoreError::NotFound(key.to_string()),
            other => StoreError::Keychain(other),
        }
    }
}

impl Default for KeychainTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeychainTokenStore {
    fn name(&self) -> &str {
        "keychain"
    }

    fn describe(&self) -> String {
        format!("system keychain (service '{}')", self.service_name)
    }

    fn get(&self, key: &str) -> StoreResult<Token> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(password) if password.trim().is_empty() => {
                debug!(key, "keychain entry is empty");
                Err(StoreError::NotFound(key.to_string()))
            }
            Ok(password) => {
                debug!(key, len = password.len(), "found token in keychain");
                Ok(Token::new(password))
            }
            Err(e) => {
                let err = Self::map_error(key, e);
                if !err.is_not_found() {
                    warn!(key, error = %err, "keychain lookup failed");
                }
                Err(err)
            }
        }
    }

    fn set(&self, key: &str, token: &Token) -> StoreResult<()> {
        let entry = self.entry(key)?;
        entry.set_password(token.expose()).map_err(|e| {
            warn!(key, error = %e, "keychain write failed");
            StoreError::Keychain(e)
        })?;

        // Confirm the write persisted by reading back through a fresh entry.
        let verify_entry = self.entry(key)?;
        match verify_entry.get_password() {
            Ok(stored) if stored == token.expose() => {
                debug!(key, "token persisted in keychain");
                Ok(())
            }
            Ok(stored) => {
                warn!(key, expected_len = token.len(), got_len = stored.len(), "keychain read-back mismatch");
                // Don't leave a divergent entry behind to shadow a fallback write
                if let Err(e) = verify_entry.delete_credential() {
                    warn!(key, error = %e, "failed to remove mismatched keychain entry");
                }
                Err(StoreError::KeychainNotPersisted(key.to_string()))
            }
            Err(e) => {
                warn!(key, error = %e, "keychain read-back failed");
                Err(StoreError::KeychainNotPersisted(key.to_string()))
            }
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let entry = self.entry(key)?;
        entry
            .delete_credential()
            .map_err(|e| Self::map_error(key, e))?;
        debug!(key, "deleted token from keychain");
        Ok(())
    }
}
