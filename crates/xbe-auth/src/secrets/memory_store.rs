//! In-memory token store

use std::collections::HashMap;
use std::io;
use std::sync::{PoisonError, RwLock};

use super::traits::{StoreError, StoreResult, Token, TokenStore};

/// In-memory token store for testing and ephemeral use
///
/// Behaves like the file store: missing or empty values are `NotFound`, and
/// deleting a missing key is `NotFound`. [`MemoryTokenStore::unavailable`]
/// builds a store that fails every operation, standing in for a keychain
/// that can't be reached.
///
/// # Example
///
/// ```
/// use xbe_auth::secrets::{MemoryTokenStore, Token, TokenStore};
///
/// let store = MemoryTokenStore::new();
/// store.set("https://x", &Token::new("tok")).unwrap();
/// assert_eq!(store.get("https://x").unwrap().expose(), "tok");
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, Token>>,
    unavailable: bool,
}

impl MemoryTokenStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with an I/O error
    pub fn unavailable() -> Self {
        Self {
            tokens: RwLock::default(),
            unavailable: true,
        }
    }

    /// Create a memory store with initial values
    pub fn with_tokens<I, K, V>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Token>,
    {
        Self {
            tokens: RwLock::new(
                initial
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            unavailable: false,
        }
    }

    /// Number of stored tokens
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "token store unavailable",
            )));
        }
        Ok(())
    }
}

impl TokenStore for MemoryTokenStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> StoreResult<Token> {
        self.check_available()?;
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(key)
            .filter(|token| !token.is_empty())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set(&self, key: &str, token: &Token) -> StoreResult<()> {
        self.check_available()?;
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(key.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
