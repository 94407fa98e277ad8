//! Token resolution from multiple sources
//!
//! Checks sources in priority order, first match wins:
//! 1. Explicit value (`--token`)
//! 2. Environment variables (`XBE_TOKEN`, then `XBE_API_TOKEN`)
//! 3. System keychain, then the token file (via `CombinedTokenStore`)

use tracing::debug;

use crate::config::Settings;
use crate::key::normalize_base_url;
use crate::secrets::{
    CombinedTokenStore, EnvTokenStore, ResolvedToken, StoreError, StoreResult, Token,
    TokenSource,
};

/// Resolves the API token for a base URL
///
/// Provenance is returned with every result; the resolver keeps no record
/// of previous lookups.
#[derive(Debug)]
pub struct TokenResolver {
    env: EnvTokenStore,
    /// `None` when no token storage location could be determined
    store: Option<CombinedTokenStore>,
}

impl TokenResolver {
    pub fn new(env: EnvTokenStore, store: CombinedTokenStore) -> Self {
        Self {
            env,
            store: Some(store),
        }
    }

    /// Standard environment variables plus the keychain/file store from `settings`
    ///
    /// Never fails: if the store can't be located, explicit and environment
    /// tokens still resolve and only the stored-token step reports the error.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_store(EnvTokenStore::new(), CombinedTokenStore::from_settings(settings))
    }

    fn with_store(env: EnvTokenStore, store: StoreResult<CombinedTokenStore>) -> Self {
        let store = match store {
            Ok(store) => Some(store),
            Err(e) => {
                debug!(error = %e, "token storage unavailable");
                None
            }
        };
        Self { env, store }
    }

    /// The backing store, for login/logout
    pub fn store(&self) -> StoreResult<&CombinedTokenStore> {
        self.store.as_ref().ok_or(StoreError::NoConfigDir)
    }

    /// Resolve the token for `base_url`
    ///
    /// A blank `explicit` value is ignored. `Err(StoreError::NotFound)` means
    /// no token is configured anywhere; other errors come from the store.
    pub fn resolve(&self, explicit: Option<&str>, base_url: &str) -> StoreResult<ResolvedToken> {
        if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
            debug!("using explicit token");
            return Ok(ResolvedToken::new(
                Token::new(value),
                TokenSource::Explicit,
                "--token flag",
            ));
        }

        if let Some((token, var)) = self.env.lookup() {
            debug!(var, "using token from environment");
            return Ok(ResolvedToken::new(
                token,
                TokenSource::Environment,
                format!("environment variable ${}", var),
            ));
        }

        let key = normalize_base_url(base_url);
        debug!(key = %key, "looking up stored token");
        self.store()?.get(&key)
    }

    /// Where the token for `base_url` would come from
    ///
    /// Same precedence as [`resolve`](Self::resolve), but "nothing
    /// configured" is `Ok(TokenSource::None)` instead of an error.
    pub fn source(&self, explicit: Option<&str>, base_url: &str) -> StoreResult<TokenSource> {
        match self.resolve(explicit, base_url) {
            Ok(resolved) => Ok(resolved.source),
            Err(e) if e.is_not_found() => Ok(TokenSource::None),
            Err(e) => Err(e),
        }
    }
}
