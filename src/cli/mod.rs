//! Command-line interface.

pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::core::config::Config;
use crate::error::{ConfigError, Error, Result, StoreError};

/// pass-secret-service - a freedesktop Secret Service backed by pass.
#[derive(Parser, Debug)]
#[command(
    name = "pass-secret-service",
    about = "Expose a pass password store over the freedesktop Secret Service API",
    version
)]
pub struct Cli {
    /// Path to the password store (default: $PASSWORD_STORE_DIR or ~/.password-store)
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/pass-secret-service/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Be verbose
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Validate the configuration, print the resolved settings and exit
    #[arg(long)]
    pub check: bool,
}

/// Everything the daemon needs, after merging flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_root: PathBuf,
    pub gpg: String,
    pub base_path: String,
    pub bus_name: String,
    pub blocking_threads: usize,
    pub log_filter: String,
}

impl Cli {
    /// Load the config file and apply the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file is missing, malformed or invalid.
    pub fn settings(&self) -> Result<Settings> {
        let config = Config::load(self.config.as_deref())?;
        self.apply(config)
    }

    fn apply(&self, config: Config) -> Result<Settings> {
        let store_root = match &self.path {
            Some(path) => path.clone(),
            None => config.store_root()?,
        };
        Ok(Settings {
            store_root,
            gpg: config.store.gpg,
            base_path: config.service.base_path,
            bus_name: config.service.bus_name,
            blocking_threads: config.service.blocking_threads,
            log_filter: log_filter(self.verbose, config.log_filter.as_deref()),
        })
    }
}

/// Default tracing filter: `--verbose` wins, then the config value.
pub fn log_filter(verbose: bool, configured: Option<&str>) -> String {
    match (verbose, configured) {
        (true, _) => "pass_secret_service=info".to_string(),
        (false, Some(filter)) => filter.to_string(),
        (false, None) => "pass_secret_service=warn".to_string(),
    }
}

/// A follow-up suggestion for errors the user can fix.
pub fn hint(error: &Error) -> Option<&'static str> {
    match error {
        Error::Store(StoreError::NoGpgId { .. }) => Some("run: pass init <gpg-id>"),
        Error::Cipher(_) => Some("check that gpg can decrypt: pass show <entry>"),
        Error::Config(ConfigError::NotFound(_)) => {
            Some("omit --config to use the default location")
        }
        Error::Config(ConfigError::NoHome) => Some("pass --path or set PASSWORD_STORE_DIR"),
        Error::Transport(_) => Some("is a D-Bus session bus running? check DBUS_SESSION_BUS_ADDRESS"),
        _ => None,
    }
}

/// Print resolved settings (for `--check`).
pub fn print_settings(settings: &Settings) {
    output::header("Settings");
    output::kv("store:           ", settings.store_root.display());
    output::kv("gpg:             ", &settings.gpg);
    output::kv("base path:       ", &settings.base_path);
    output::kv("bus name:        ", &settings.bus_name);
    output::kv("blocking threads:", settings.blocking_threads);
    output::kv("log filter:      ", &settings.log_filter);
    output::success("configuration is valid");
}
