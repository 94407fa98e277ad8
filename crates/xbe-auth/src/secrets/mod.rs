//! Token storage abstractions and implementations
//!
//! This module provides:
//! - `TokenStore` trait shared by every backend
//! - Backends: `KeychainTokenStore`, `FileTokenStore`, `EnvTokenStore`, `MemoryTokenStore`
//! - `CombinedTokenStore`, the keychain-with-file-fallback store used by the CLI

mod traits;
mod env_store;
mod memory_store;
mod file_store;
mod keychain_store;
mod combined_store;

pub use traits::{ResolvedToken, StoreError, StoreResult, Token, TokenSource, TokenStore};
pub use env_store::EnvTokenStore;
pub use memory_store::MemoryTokenStore;
pub use file_store::FileTokenStore;
pub use keychain_store::KeychainTokenStore;
pub use combined_store::{BackendState, BackendStatus, CombinedTokenStore};
