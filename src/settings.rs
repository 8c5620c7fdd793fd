//! settings
//!
//! Runtime settings: which wikis to talk to and how to authenticate.
//!
//! # Locations
//!
//! Searched in order:
//! 1. `--settings <path>` on the command line
//! 2. `$MASSLIST_CONFIG` if set
//! 3. `<config dir>/masslist/config.toml` (e.g. `~/.config/masslist/config.toml`)
//!
//! A settings file is required; there are no usable defaults for the
//! API URL or the bot account.
//!
//! # Example
//!
//! ```toml
//! api_url = "https://en.wikipedia.org/w/api.php"
//! shared_api_url = "https://meta.wikimedia.org/w/api.php"
//! db_name = "enwiki"
//! username = "ExampleBot"
//! password_env = "MASSLIST_PASSWORD"
//! shutoff_task = "masslist"
//! ```
//!
//! The bot password itself never lives in the file; it is read from the
//! environment variable named by `password_env`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding an explicit settings path.
pub const SETTINGS_ENV: &str = "MASSLIST_CONFIG";

/// Default environment variable holding the bot password.
pub const DEFAULT_PASSWORD_ENV: &str = "MASSLIST_PASSWORD";

/// Errors from settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid settings value: {0}")]
    InvalidValue(String),

    #[error("no settings file found; create one or pass --settings")]
    NotFound,

    #[error("password environment variable '{0}' is not set")]
    MissingPassword(String),
}

/// Bot settings loaded from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Full api.php URL of the wiki whose lists are maintained.
    pub api_url: String,

    /// Optional api.php URL of the shared identity origin (global
    /// renames, meta rights changes).
    pub shared_api_url: Option<String>,

    /// Database name of the local wiki, used to qualify shared log
    /// titles (e.g. "enwiki").
    pub db_name: String,

    /// Bot account username.
    pub username: String,

    /// Environment variable holding the bot password.
    pub password_env: Option<String>,

    /// User-Agent header override.
    pub user_agent: Option<String>,

    /// Task name for the on-wiki shutoff page; the empty default
    /// disables the check.
    pub shutoff_task: Option<String>,
}

impl Settings {
    /// Load settings from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::NotFound` when no file exists at any
    /// location, and read/parse/validation errors otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let path = Self::resolve_path(explicit)?;
        let settings = Self::read(&path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve which settings file to read.
    fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, SettingsError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(SETTINGS_ENV) {
            return Ok(PathBuf::from(path));
        }
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("masslist/config.toml");
            if path.exists() {
                return Ok(path);
            }
        }
        Err(SettingsError::NotFound)
    }

    /// Read and parse a settings file.
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| SettingsError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate the settings values.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` if a required value is
    /// missing or malformed.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("api_url", &self.api_url),
            ("db_name", &self.db_name),
            ("username", &self.username),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "{name} must be set and non-empty"
                )));
            }
        }

        for (name, url) in [
            ("api_url", Some(&self.api_url)),
            ("shared_api_url", self.shared_api_url.as_ref()),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(SettingsError::InvalidValue(format!(
                        "{name} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Environment variable the bot password is read from.
    pub fn password_env(&self) -> &str {
        self.password_env.as_deref().unwrap_or(DEFAULT_PASSWORD_ENV)
    }

    /// Read the bot password from the environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingPassword` when the variable named
    /// by [`password_env`](Self::password_env) is unset.
    pub fn password(&self) -> Result<String, SettingsError> {
        let var = self.password_env();
        std::env::var(var).map_err(|_| SettingsError::MissingPassword(var.to_string()))
    }

    /// Title of the on-wiki shutoff page, when the check is enabled.
    pub fn shutoff_page(&self) -> Option<String> {
        let task = self.shutoff_task.as_deref()?.trim();
        if task.is_empty() {
            return None;
        }
        Some(format!("User:{}/shutoff/{}.json", self.username, task))
    }
}
