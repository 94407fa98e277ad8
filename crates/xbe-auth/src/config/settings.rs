//! Settings resolved from the environment

use std::env;
use std::path::PathBuf;

use crate::secrets::{StoreError, StoreResult};

/// Directory name under the config directory
pub const APP_NAME: &str = "xbe";

/// Token file name inside `{config_dir}/xbe/`
pub const TOKEN_FILE_NAME: &str = "config.json";

/// Keychain service all tokens are stored under
pub const KEYCHAIN_SERVICE: &str = "xbe-cli";

pub const DEFAULT_BASE_URL: &str = "https://app.x-b-e.com";

/// Token variables, in priority order
pub const TOKEN_ENV_VARS: [&str; 2] = ["XBE_TOKEN", "XBE_API_TOKEN"];

pub const BASE_URL_ENV: &str = "XBE_BASE_URL";

/// Overrides the platform config directory
pub const CONFIG_DIR_ENV: &str = "XDG_CONFIG_HOME";

/// Where the CLI talks to and where it keeps tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// API base URL; its normalized form is the token lookup key
    pub base_url: String,
    /// Keychain service name
    pub keychain_service: String,
    /// Explicit config directory, takes precedence over the platform default
    pub config_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            keychain_service: KEYCHAIN_SERVICE.to_string(),
            config_dir: None,
        }
    }
}

impl Settings {
    /// Read `XBE_BASE_URL` and `XDG_CONFIG_HOME` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();
        if let Some(base_url) = non_blank(BASE_URL_ENV) {
            settings.base_url = base_url;
        }
        settings.config_dir = non_blank(CONFIG_DIR_ENV).map(PathBuf::from);
        settings
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn with_keychain_service(mut self, service: impl Into<String>) -> Self {
        self.keychain_service = service.into();
        self
    }

    /// The directory holding per-application config
    ///
    /// Order: explicit override, platform config dir, `$HOME/.config`.
    pub fn config_dir(&self) -> StoreResult<PathBuf> {
        self.config_dir
            .clone()
            .or_else(dirs::config_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or(StoreError::NoConfigDir)
    }

    /// Full path of the token file
    pub fn token_file_path(&self) -> StoreResult<PathBuf> {
        Ok(self.config_dir()?.join(APP_NAME).join(TOKEN_FILE_NAME))
    }
}
