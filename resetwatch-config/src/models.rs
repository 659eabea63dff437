//! Configuration model and conversions into core settings.

use std::path::PathBuf;

use resetwatch_core::fs_watch::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_FILE_MARKER};
use resetwatch_core::generator::INTERNAL_RESET_LIFETIME_MINUTES;
use resetwatch_core::{ProcessorSettings, ResetLinkBuilder, WatchSettings};
use serde::{Deserialize, Serialize};

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// `[password_resets]` section.
    pub password_resets: PasswordResetConfig,
    /// `[notifications]` section.
    pub notifications: NotificationConfig,
    /// `[directory]` section.
    pub directory: DirectoryConfig,
}

/// Settings for the reset watcher and reset links.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordResetConfig {
    /// Directory the identity service writes reset files into. Leaving it
    /// unset disables the watcher for the run.
    pub watch_directory: Option<PathBuf>,
    /// Public base URL of the reset page, e.g. `https://accounts.example.com`.
    /// Leaving it unset disables reset links.
    pub url_base: Option<String>,
    /// File-name substring that marks a reset file.
    pub file_marker: String,
    /// Validity window for admin-generated resets.
    pub internal_lifetime_minutes: u32,
    /// Bound on the watcher's event and error channels.
    pub channel_capacity: usize,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            watch_directory: None,
            url_base: None,
            file_marker: DEFAULT_FILE_MARKER.to_string(),
            internal_lifetime_minutes: INTERNAL_RESET_LIFETIME_MINUTES as u32,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PasswordResetConfig {
    /// `None` when no watch directory is configured.
    pub fn watch_settings(&self) -> Option<WatchSettings> {
        self.watch_directory.as_ref().map(|directory| WatchSettings {
            directory: directory.clone(),
            channel_capacity: self.channel_capacity.max(1),
        })
    }

    /// Link builder over the configured URL base.
    pub fn link_builder(&self) -> ResetLinkBuilder {
        ResetLinkBuilder::new(self.url_base.clone())
    }

    /// Lifetime of admin-generated resets, at least one minute.
    pub fn internal_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.internal_lifetime_minutes.max(1)))
    }

    fn normalize(&mut self) {
        self.watch_directory = self
            .watch_directory
            .take()
            .filter(|path| !path.as_os_str().is_empty());
        self.url_base = self
            .url_base
            .take()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if self.file_marker.trim().is_empty() {
            self.file_marker = DEFAULT_FILE_MARKER.to_string();
        }
    }
}

/// Notification switch and outbox location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Host-wide notification switch. When off, reset files are ignored.
    pub enabled: bool,
    /// Where the spool notifier drops rendered messages.
    pub outbox_directory: PathBuf,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            outbox_directory: PathBuf::from("outbox"),
        }
    }
}

/// Where the user directory comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// TOML file listing known users.
    pub users_file: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("users.toml"),
        }
    }
}

impl Config {
    /// Processor switches for the core pipeline.
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            notifications_enabled: self.notifications.enabled,
            file_marker: self.password_resets.file_marker.clone(),
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.password_resets.normalize();
    }
}
