//! XBE Auth
//!
//! Resolves and stores the API token used by the `xbe` CLI.
//!
//! A token is looked up in this order, first match wins:
//! 1. An explicit value (the `--token` flag)
//! 2. `XBE_TOKEN`, then `XBE_API_TOKEN`
//! 3. The system keychain
//! 4. The token file at `{config_dir}/xbe/config.json`
//!
//! ```rust,no_run
//! use xbe_auth::{Settings, TokenResolver};
//!
//! let settings = Settings::from_env();
//! let resolver = TokenResolver::from_settings(&settings);
//!
//! match resolver.resolve(None, &settings.base_url) {
//!     Ok(resolved) => println!("using token from {}", resolved.source),
//!     Err(e) if e.is_not_found() => println!("not logged in"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), xbe_auth::StoreError>(())
//! ```

pub mod config;
pub mod key;
pub mod resolver;
pub mod secrets;

pub use config::Settings;
pub use key::normalize_base_url;

pub use secrets::{
    BackendState, BackendStatus, CombinedTokenStore, EnvTokenStore, FileTokenStore,
    KeychainTokenStore, MemoryTokenStore, StoreError, StoreResult, Token, TokenSource,
    TokenStore,
};

pub use resolver::{ResolvedToken, TokenResolver};
