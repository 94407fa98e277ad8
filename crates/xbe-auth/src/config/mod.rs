//! Settings and well-known names
//!
//! - `Settings`: base URL, keychain service and config directory override
//! - Constants for the environment variables and file layout the CLI uses

mod settings;

pub use settings::{
    Settings, APP_NAME, BASE_URL_ENV, CONFIG_DIR_ENV, DEFAULT_BASE_URL, KEYCHAIN_SERVICE,
    TOKEN_ENV_VARS, TOKEN_FILE_NAME,
};
