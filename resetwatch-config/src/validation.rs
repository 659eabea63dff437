//! Non-fatal configuration checks.

use url::Url;

use crate::models::Config;

/// A non-fatal configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// What is wrong.
    pub message: String,
    /// How to fix it, when known.
    pub hint: Option<String>,
}

/// Warnings collected while loading configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    /// Warnings in the order they were found.
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    /// Add a warning without a hint.
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    /// Add a warning with a remediation hint.
    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    /// `true` when nothing was flagged.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append another set of warnings.
    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    /// Iterate over the warnings.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Non-fatal checks on a normalized configuration.
pub fn validate(config: &Config) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();
    let resets = &config.password_resets;

    if resets.watch_directory.is_none() {
        warnings.push_with_hint(
            "password_resets.watch_directory not configured; reset file watcher is disabled",
            "Set password_resets.watch_directory or RESETWATCH_WATCH_DIRECTORY",
        );
    }

    match resets.url_base.as_deref() {
        None => warnings.push_with_hint(
            "password_resets.url_base not configured; reset links are disabled",
            "Set password_resets.url_base or RESETWATCH_URL_BASE",
        ),
        Some(raw) => {
            if let Err(err) = Url::parse(raw) {
                warnings.push_with_hint(
                    format!("password_resets.url_base \"{raw}\" is not a valid URL: {err}"),
                    "Use an absolute URL such as https://accounts.example.com",
                );
            }
        }
    }

    if !config.notifications.enabled {
        warnings.push("notifications.enabled is false; reset files will be ignored");
    }

    warnings
}
