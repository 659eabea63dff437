//! Configuration loading.
//!
//! Evaluation order:
//! 1) `$RESETWATCH_CONFIG_PATH` (TOML or JSON file),
//! 2) `$RESETWATCH_CONFIG_JSON` (inline JSON),
//! 3) the first default file found under the search root,
//! 4) defaults.
//!
//! `RESETWATCH_WATCH_DIRECTORY`, `RESETWATCH_URL_BASE` and
//! `RESETWATCH_NOTIFICATIONS_ENABLED` override whatever was loaded.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::Config;
use crate::validation::{ConfigWarnings, validate};

/// Path to a TOML or JSON config file.
pub const ENV_CONFIG_PATH: &str = "RESETWATCH_CONFIG_PATH";
/// Inline JSON configuration.
pub const ENV_CONFIG_JSON: &str = "RESETWATCH_CONFIG_JSON";
/// Overrides `password_resets.watch_directory`.
pub const ENV_WATCH_DIRECTORY: &str = "RESETWATCH_WATCH_DIRECTORY";
/// Overrides `password_resets.url_base`.
pub const ENV_URL_BASE: &str = "RESETWATCH_URL_BASE";
/// Overrides `notifications.enabled`.
pub const ENV_NOTIFICATIONS_ENABLED: &str = "RESETWATCH_NOTIFICATIONS_ENABLED";

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "resetwatch.toml",
    "resetwatch.json",
    "config/resetwatch.toml",
    "config/resetwatch.json",
];

/// Fatal configuration errors.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// A config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// A config file or inline value did not parse.
    #[error("invalid config {origin}: {message}")]
    Parse {
        /// File path or variable name.
        origin: String,
        /// Parser message.
        message: String,
    },
    /// A boolean override was not a recognised flag value.
    #[error("{name} must be true or false, got \"{value}\"")]
    InvalidFlag {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// Nothing found; built-in defaults.
    #[default]
    Default,
    /// File named by `RESETWATCH_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// JSON from `RESETWATCH_CONFIG_JSON`.
    EnvInline,
    /// A default file found under the search root.
    File(PathBuf),
}

/// Result of a successful load.
#[derive(Debug)]
pub struct ConfigLoad {
    /// Normalized configuration.
    pub config: Config,
    /// Where it came from.
    pub source: ConfigSource,
    /// Non-fatal problems found during validation.
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

/// Resolves configuration from files and environment variables.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env: EnvSource,
    search_root: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment, searching the working directory.
    pub fn new() -> Self {
        Self {
            env: EnvSource::Process,
            search_root: PathBuf::from("."),
        }
    }

    /// Loader reading only the supplied variables instead of the process environment.
    pub fn with_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: EnvSource::Fixed(
                vars.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
            search_root: PathBuf::from("."),
        }
    }

    /// Directory searched for default config files.
    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    /// Load, apply overrides, normalize and validate.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (mut config, source) = self.load_base()?;
        self.apply_env_overrides(&mut config)?;
        config.normalize();

        let warnings = validate(&config);
        debug!(source = ?source, warnings = warnings.items.len(), "configuration loaded");

        Ok(ConfigLoad {
            config,
            source,
            warnings,
        })
    }

    fn load_base(&self) -> Result<(Config, ConfigSource), ConfigLoadError> {
        if let Some(path_str) = self.var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path_str);
            let config = Config::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = self.var(ENV_CONFIG_JSON) {
            let config = Config::parse_json(&raw, ENV_CONFIG_JSON)?;
            return Ok((config, ConfigSource::EnvInline));
        }

        if let Some(path) = self.find_default_file() {
            let config = Config::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Config::default(), ConfigSource::Default))
    }

    fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigLoadError> {
        if let Some(directory) = self.var(ENV_WATCH_DIRECTORY) {
            config.password_resets.watch_directory = Some(PathBuf::from(directory));
        }
        if let Some(url_base) = self.var(ENV_URL_BASE) {
            config.password_resets.url_base = Some(url_base);
        }
        if let Some(raw) = self.var(ENV_NOTIFICATIONS_ENABLED) {
            config.notifications.enabled = parse_flag(ENV_NOTIFICATIONS_ENABLED, &raw)?;
        }
        Ok(())
    }

    /// Blank variables count as unset.
    fn var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            EnvSource::Process => env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|value| !value.trim().is_empty())
    }

    fn find_default_file(&self) -> Option<PathBuf> {
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(|candidate| self.search_root.join(candidate))
            .find(|path| path.exists())
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigLoadError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigLoadError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

impl Config {
    /// Parse a file, choosing the format by extension.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents, &origin),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                    origin,
                    message: err.to_string(),
                })
            }
            _ => Self::parse_from_str(&contents, &origin),
        }
    }

    /// Try TOML first, then JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| ConfigLoadError::Parse {
                origin: origin.to_string(),
                message: format!("toml error: {toml_err}; json error: {json_err}"),
            })
        })
    }

    /// Parse JSON, tagging errors with `origin`.
    pub fn parse_json(raw: &str, origin: &str) -> Result<Self, ConfigLoadError> {
        serde_json::from_str(raw).map_err(|err| ConfigLoadError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })
    }
}
