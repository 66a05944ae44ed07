//! Configuration file management.
//!
//! Reads and validates the optional `config.toml`:
//!
//! ```toml
//! log_filter = "pass_secret_service=debug"
//!
//! [store]
//! path = "/home/alice/.password-store"
//! gpg = "gpg2"
//!
//! [service]
//! base_path = "/org/freedesktop/secrets"
//! bus_name = "org.freedesktop.secrets"
//! blocking_threads = 4
//! ```
//!
//! Every field is optional.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants::{
    BASE_PATH, BUS_NAME, CONFIG_DIR, CONFIG_FILE, DEFAULT_STORE_DIR, STORE_DIR_ENV,
};
use crate::core::path::is_valid_base;
use crate::error::{ConfigError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default tracing filter, used when the log environment variable is unset.
    pub log_filter: Option<String>,
    pub store: StoreConfig,
    pub service: ServiceConfig,
}

/// The `[store]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Password store root. Falls back to `$PASSWORD_STORE_DIR`, then
    /// `~/.password-store`.
    pub path: Option<PathBuf>,
    /// gpg executable.
    pub gpg: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            gpg: "gpg".to_string(),
        }
    }
}

/// The `[service]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub base_path: String,
    pub bus_name: String,
    /// Upper bound on threads running blocking store calls.
    pub blocking_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_path: BASE_PATH.to_string(),
            bus_name: BUS_NAME.to_string(),
            blocking_threads: 4,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/pass-secret-service/config.toml`, if a config
    /// directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` for a missing explicit file,
    /// `ConfigError::Parse` for malformed TOML, or a validation error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()).into());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(&path).map_err(ConfigError::ReadFile)?;
        Self::parse(&contents)
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks:
    /// - `service.base_path` is an absolute object path other than `/`
    /// - `service.bus_name` is not empty
    /// - `service.blocking_threads` is at least 1
    /// - `store.gpg` is not empty
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_base(&self.service.base_path) {
            return Err(ConfigError::InvalidValue {
                field: "service.base_path",
                reason: format!("not a valid object path: {:?}", self.service.base_path),
            }
            .into());
        }

        if self.service.bus_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.bus_name",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.service.blocking_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.blocking_threads",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.store.gpg.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.gpg",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// The password store root to use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHome` if no path is configured and the home
    /// directory is unknown.
    pub fn store_root(&self) -> Result<PathBuf> {
        resolve_store_root(
            self.store.path.clone(),
            std::env::var_os(STORE_DIR_ENV),
            dirs::home_dir(),
        )
    }
}

/// Configured path, then the environment, then `<home>/.password-store`.
fn resolve_store_root(
    configured: Option<PathBuf>,
    env: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path);
    }
    if let Some(dir) = env.filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    home.map(|home| home.join(DEFAULT_STORE_DIR))
        .ok_or_else(|| ConfigError::NoHome.into())
}
