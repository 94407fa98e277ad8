//! Core traits and types for token storage

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::error::Category;
use thiserror::Error;
use zeroize::Zeroizing;

/// An API token
///
/// The value is wiped from memory on drop and never shows up in `Debug`
/// output. Use [`Token::expose`] at the point where the raw value is needed.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Zeroizing<String>);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// The raw token value
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// Passed in directly, e.g. `--token`
    Explicit,
    /// `XBE_TOKEN` or `XBE_API_TOKEN`
    Environment,
    /// System keychain
    Keychain,
    /// Token file under the config directory
    File,
    /// No token configured
    None,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Explicit => "explicit",
            TokenSource::Environment => "environment",
            TokenSource::Keychain => "keychain",
            TokenSource::File => "file",
            TokenSource::None => "none",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token together with the layer that supplied it
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    /// The token value
    pub token: Token,
    /// Which layer provided the token
    pub source: TokenSource,
    /// Human-readable source description
    pub source_detail: String,
}

impl ResolvedToken {
    pub fn new(token: Token, source: TokenSource, source_detail: impl Into<String>) -> Self {
        Self {
            token,
            source,
            source_detail: source_detail.into(),
        }
    }

    /// Value for the `Authorization` request header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }
}

/// Errors that can occur during token store operations
///
/// None of the messages include token values.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No token is stored under the key. Expected, not an operational failure.
    #[error("No token found for {0}")]
    NotFound(String),

    /// The message carries the position only; serde's own text can quote file content.
    #[error("Failed to parse token file {}: {kind} at line {line}, column {column}", path.display())]
    Parse {
        path: PathBuf,
        kind: &'static str,
        line: usize,
        column: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[source] keyring::Error),

    #[error("Keychain did not persist the token for {0}")]
    KeychainNotPersisted(String),

    #[error("Store is read-only")]
    ReadOnly,

    #[error("Could not determine a configuration directory (set XDG_CONFIG_HOME)")]
    NoConfigDir,

    /// Both backends of a combined store failed
    #[error("{primary_store}: {primary}; {secondary_store}: {secondary}")]
    Combined {
        primary_store: String,
        primary: Box<StoreError>,
        secondary_store: String,
        secondary: Box<StoreError>,
    },
}

impl StoreError {
    /// True for the expected "nothing stored here" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// `Parse` error for `path` that keeps only the position of `err`
    pub fn parse(path: impl Into<PathBuf>, err: &serde_json::Error) -> Self {
        let kind = match err.classify() {
            Category::Io => "read error",
            Category::Syntax => "invalid JSON",
            Category::Data => "unexpected structure",
            Category::Eof => "unexpected end of file",
        };
        StoreError::Parse {
            path: path.into(),
            kind,
            line: err.line(),
            column: err.column(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for token storage implementations
///
/// Implementations:
/// - System keychain (`KeychainTokenStore`)
/// - JSON token file (`FileTokenStore`)
/// - Environment variables, read-only (`EnvTokenStore`)
/// - In-memory for testing (`MemoryTokenStore`)
/// - Keychain with file fallback (`CombinedTokenStore` composes two stores)
///
/// A missing token is reported as [`StoreError::NotFound`], never as `Ok`
/// with an empty value.
pub trait TokenStore: Send + Sync {
    /// Short name of this store, used in logs and diagnostics
    fn name(&self) -> &str;

    /// Longer description, e.g. including a file path
    fn describe(&self) -> String {
        self.name().to_string()
    }

    /// Retrieve the token stored under `key`
    fn get(&self, key: &str) -> StoreResult<Token>;

    /// Store a token under `key`, replacing any previous value
    fn set(&self, key: &str, token: &Token) -> StoreResult<()>;

    /// Remove the token stored under `key`
    ///
    /// Returns `Err(StoreError::NotFound)` when nothing was stored.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Check if a token exists, propagating operational errors
    fn has(&self, key: &str) -> StoreResult<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
