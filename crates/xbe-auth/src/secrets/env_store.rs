//! Environment variable token source

use std::env;

use super::traits::{StoreError, StoreResult, Token, TokenStore};
use crate::config::TOKEN_ENV_VARS;

/// Token source that reads from environment variables
///
/// This store is read-only. It checks a fixed list of variables in order
/// (`XBE_TOKEN`, then `XBE_API_TOKEN`) and the first non-blank value wins.
/// The lookup key is ignored: one environment token applies to every base URL.
///
/// # Example
///
/// ```
/// use xbe_auth::secrets::EnvTokenStore;
///
/// let store = EnvTokenStore::new();
/// if let Some((_token, var)) = store.lookup() {
///     println!("token from ${}", var);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EnvTokenStore {
    vars: Vec<String>,
}

impl EnvTokenStore {
    /// Read the standard `XBE_TOKEN` / `XBE_API_TOKEN` variables
    pub fn new() -> Self {
        Self::with_vars(TOKEN_ENV_VARS)
    }

    /// Read a custom list of variables, highest priority first
    pub fn with_vars<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// First non-blank variable, with its name
    pub fn lookup(&self) -> Option<(Token, &str)> {
        self.vars.iter().find_map(|name| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (Token::new(value), name.as_str()))
        })
    }
}

impl Default for EnvTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for EnvTokenStore {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> StoreResult<Token> {
        self.lookup()
            .map(|(token, _)| token)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set(&self, _key: &str, _token: &Token) -> StoreResult<()> {
        Err(StoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::ReadOnly)
    }
}
