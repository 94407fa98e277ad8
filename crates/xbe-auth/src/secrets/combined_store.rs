//! Keychain-first token store with a file fallback

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::file_store::FileTokenStore;
use super::keychain_store::KeychainTokenStore;
use super::traits::{ResolvedToken, StoreError, StoreResult, Token, TokenSource, TokenStore};
use crate::config::Settings;

/// State of one backend for a given key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    Present,
    Absent,
    Error(String),
}

impl BackendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Present => "present",
            BackendState::Absent => "absent",
            BackendState::Error(_) => "error",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BackendState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Diagnostic entry produced by [`CombinedTokenStore::backend_status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub source: TokenSource,
    pub store: String,
    pub state: BackendState,
}

/// Two stores composed with fixed precedence
///
/// The primary store (the system keychain) is authoritative. The secondary
/// store (the token file) is used when the primary has nothing or can't be
/// reached. Tokens from the primary are reported as
/// [`TokenSource::Keychain`], tokens from the secondary as
/// [`TokenSource::File`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use xbe_auth::secrets::{CombinedTokenStore, MemoryTokenStore, Token, TokenSource};
///
/// // Keychain unreachable: writes land in the fallback store
/// let store = CombinedTokenStore::new(
///     Arc::new(MemoryTokenStore::unavailable()),
///     Arc::new(MemoryTokenStore::new()),
/// );
/// assert_eq!(store.set("https://x", &Token::new("tok")).unwrap(), TokenSource::File);
/// assert_eq!(store.get("https://x").unwrap().source, TokenSource::File);
/// ```
pub struct CombinedTokenStore {
    primary: Arc<dyn TokenStore>,
    secondary: Arc<dyn TokenStore>,
}

impl CombinedTokenStore {
    pub fn new(primary: Arc<dyn TokenStore>, secondary: Arc<dyn TokenStore>) -> Self {
        Self { primary, secondary }
    }

    /// System keychain backed by the token file, both located via `settings`
    pub fn from_settings(settings: &Settings) -> StoreResult<Self> {
        let keychain = KeychainTokenStore::with_service(settings.keychain_service.as_str());
        let file = FileTokenStore::at_default_location(settings)?;
        Ok(Self::new(Arc::new(keychain), Arc::new(file)))
    }

    pub fn primary(&self) -> &Arc<dyn TokenStore> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn TokenStore> {
        &self.secondary
    }

    fn from_primary(&self, token: Token) -> ResolvedToken {
        ResolvedToken::new(token, TokenSource::Keychain, self.primary.describe())
    }

    fn from_secondary(&self, token: Token) -> ResolvedToken {
        ResolvedToken::new(token, TokenSource::File, self.secondary.describe())
    }

    /// Look up the token for `key`
    ///
    /// A primary error other than `NotFound` does not stop the lookup: the
    /// secondary is still consulted and, if it also fails, its error is the
    /// one returned. The primary error is only logged.
    pub fn get(&self, key: &str) -> StoreResult<ResolvedToken> {
        let primary_err = match self.primary.get(key) {
            Ok(token) => return Ok(self.from_primary(token)),
            Err(e) if e.is_not_found() => {
                debug!(key, store = self.primary.name(), "no token in primary store");
                None
            }
            Err(e) => Some(e),
        };

        match self.secondary.get(key) {
            Ok(token) => {
                if let Some(e) = &primary_err {
                    warn!(
                        key,
                        error = %e,
                        "{} failed; using token from {}",
                        self.primary.name(),
                        self.secondary.describe()
                    );
                }
                Ok(self.from_secondary(token))
            }
            Err(e) => {
                if let Some(primary_err) = &primary_err {
                    warn!(key, error = %primary_err, "{} failed and no fallback token is usable", self.primary.name());
                }
                Err(e)
            }
        }
    }

    /// Store `token` under `key`
    ///
    /// Returns where it was written. The secondary is only written when the
    /// primary fails; a successful primary write leaves the secondary as is.
    /// After a fallback write any entry left in the primary is removed, since
    /// it would otherwise shadow the new token.
    pub fn set(&self, key: &str, token: &Token) -> StoreResult<TokenSource> {
        match self.primary.set(key, token) {
            Ok(()) => {
                debug!(key, store = self.primary.name(), "stored token");
                Ok(TokenSource::Keychain)
            }
            Err(e) => {
                warn!(
                    key,
                    error = %e,
                    "{} unavailable; storing token in {}",
                    self.primary.name(),
                    self.secondary.describe()
                );
                self.secondary.set(key, token)?;
                self.clear_primary(key);
                Ok(TokenSource::File)
            }
        }
    }

    fn clear_primary(&self, key: &str) {
        match self.primary.delete(key) {
            Ok(()) => debug!(key, store = self.primary.name(), "removed stale token"),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(
                key,
                error = %e,
                "could not remove old token from {}; it may take precedence",
                self.primary.name()
            ),
        }
    }

    /// Remove `key` from both stores
    ///
    /// Both stores are always attempted so no stale copy survives. A store
    /// that has nothing to delete counts as success. Returns whether any
    /// store actually removed a token.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        let primary = Self::classify(self.primary.delete(key));
        let secondary = Self::classify(self.secondary.delete(key));
        debug!(key, primary = ?primary.as_ref().ok(), secondary = ?secondary.as_ref().ok(), "delete");

        match (primary, secondary) {
            (Ok(a), Ok(b)) => Ok(a || b),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(primary), Err(secondary)) => Err(StoreError::Combined {
                primary_store: self.primary.name().to_string(),
                primary: Box::new(primary),
                secondary_store: self.secondary.name().to_string(),
                secondary: Box::new(secondary),
            }),
        }
    }

    /// Per-store view of `key`, for surfacing errors the fallback would hide
    pub fn backend_status(&self, key: &str) -> Vec<BackendStatus> {
        [
            (TokenSource::Keychain, &self.primary),
            (TokenSource::File, &self.secondary),
        ]
        .into_iter()
        .map(|(source, store)| BackendStatus {
            source,
            store: store.describe(),
            state: match store.has(key) {
                Ok(true) => BackendState::Present,
                Ok(false) => BackendState::Absent,
                Err(e) => BackendState::Error(e.to_string()),
            },
        })
        .collect()
    }

    /// `Ok(true)` removed, `Ok(false)` nothing there, `Err` real failure
    fn classify(result: StoreResult<()>) -> StoreResult<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Implement Debug manually since Arc<dyn TokenStore> doesn't implement Debug
impl fmt::Debug for CombinedTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedTokenStore")
            .field("primary", &self.primary.describe())
            .field("secondary", &self.secondary.describe())
            .finish()
    }
}
