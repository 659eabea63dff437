//! Turns raw filesystem notifications into delivered reset messages.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use notify::event::{EventKind, ModifyKind};
use tokio::sync::mpsc;

use crate::observer::{ResetDiagnostic, ResetObserver};
use crate::ports::{AddressBook, ResetNotifier, ResetPath, UserDirectory};
use crate::record::{ResetFile, ResetRecord};

/// Substring identifying reset files written by the identity service.
pub const DEFAULT_FILE_MARKER: &str = "passwordreset";

/// Collaborators the processor dispatches through.
#[derive(Clone)]
pub struct ResetServices {
    /// Resolves usernames from reset files.
    pub directory: Arc<dyn UserDirectory>,
    /// Renders and delivers messages.
    pub notifier: Arc<dyn ResetNotifier>,
    /// Delivery address per user.
    pub addresses: Arc<dyn AddressBook>,
}

impl fmt::Debug for ResetServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetServices").finish_non_exhaustive()
    }
}

/// Processor switches taken from host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSettings {
    /// Host-level notification switch; when off the processor exits immediately.
    pub notifications_enabled: bool,
    /// File-name substring that marks a reset file.
    pub file_marker: String,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            file_marker: DEFAULT_FILE_MARKER.to_string(),
        }
    }
}

/// Terminal state reached while handling one filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a content write, or not a reset file.
    Ignored,
    /// The file could not be read.
    ReadFailed,
    /// The file could not be decoded.
    DecodeFailed,
    /// The record had expired.
    Expired,
    /// The user could not be resolved.
    UserNotFound,
    /// The user has no delivery address.
    NoAddress,
    /// The message could not be rendered.
    ConstructFailed,
    /// The message could not be delivered.
    SendFailed,
    /// The message was delivered.
    Sent,
}

/// Consumes watch events and dispatches reset files.
pub struct EventProcessor {
    services: ResetServices,
    settings: ProcessorSettings,
    observer: Arc<dyn ResetObserver>,
}

impl fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProcessor")
            .field("services", &self.services)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EventProcessor {
    /// Processor dispatching through `services`.
    pub fn new(
        services: ResetServices,
        settings: ProcessorSettings,
        observer: Arc<dyn ResetObserver>,
    ) -> Self {
        Self {
            services,
            settings,
            observer,
        }
    }

    /// Process events until either channel closes.
    ///
    /// Events are handled one at a time in arrival order; a slow delivery
    /// holds up everything queued behind it. Every per-event failure is
    /// reported and the loop moves on to the next event.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<notify::Event>,
        mut errors: mpsc::Receiver<notify::Error>,
    ) {
        if !self.settings.notifications_enabled {
            self.observer.observe(ResetDiagnostic::ProcessorDisabled);
            return;
        }
        self.observer.observe(ResetDiagnostic::ProcessorStarted);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(&event).await;
                }
                error = errors.recv() => {
                    let Some(error) = error else { break };
                    self.observer.observe(ResetDiagnostic::WatcherError {
                        error: error.to_string(),
                    });
                }
            }
        }

        self.observer.observe(ResetDiagnostic::ProcessorStopped);
    }

    /// Handle a single filesystem event end to end.
    pub async fn handle_event(&self, event: &notify::Event) -> EventOutcome {
        if !is_write(&event.kind) {
            return EventOutcome::Ignored;
        }
        let Some(path) = event
            .paths
            .iter()
            .find(|path| is_reset_file(path, &self.settings.file_marker))
        else {
            return EventOutcome::Ignored;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.observer.observe(ResetDiagnostic::ReadFailed {
                    path: path.clone(),
                    error: err.to_string(),
                });
                return EventOutcome::ReadFailed;
            }
        };

        let record = match ResetFile::decode(&bytes) {
            Ok(record) => record,
            Err(err) => {
                self.observer.observe(ResetDiagnostic::DecodeFailed {
                    path: path.clone(),
                    error: err.to_string(),
                });
                return EventOutcome::DecodeFailed;
            }
        };

        self.dispatch(&record).await
    }

    /// Validate, resolve and deliver a single decoded record.
    pub async fn dispatch(&self, record: &ResetRecord) -> EventOutcome {
        let username = record.username().to_string();
        self.observer.observe(ResetDiagnostic::ResetRequested {
            username: username.clone(),
        });

        if !record.is_actionable_at(Utc::now()) {
            self.observer.observe(ResetDiagnostic::Expired {
                username,
                expiry: record.expiry(),
            });
            return EventOutcome::Expired;
        }

        let Some(user_id) = self.resolve_user(record).await else {
            return EventOutcome::UserNotFound;
        };

        let recipient = self.services.addresses.address_or_name(&user_id).await;
        if recipient.is_empty() {
            return EventOutcome::NoAddress;
        }

        let path = if record.is_internal() {
            ResetPath::Admin
        } else {
            ResetPath::File
        };
        let message = match self.services.notifier.construct_reset(record, path).await {
            Ok(message) => message,
            Err(err) => {
                self.observer.observe(ResetDiagnostic::ConstructFailed {
                    username,
                    error: err.to_string(),
                });
                return EventOutcome::ConstructFailed;
            }
        };

        match self.services.notifier.send_by_id(&message, &user_id).await {
            Ok(()) => {
                self.observer
                    .observe(ResetDiagnostic::Sent { username, recipient });
                EventOutcome::Sent
            }
            Err(err) => {
                self.observer.observe(ResetDiagnostic::SendFailed {
                    username,
                    recipient,
                    error: err.to_string(),
                });
                EventOutcome::SendFailed
            }
        }
    }

    async fn resolve_user(&self, record: &ResetRecord) -> Option<String> {
        if let Some(user_id) = record.user_id() {
            return Some(user_id.to_string());
        }

        let username = record.username();
        match self.services.directory.user_by_name(username).await {
            Ok(response) if response.is_found_by_name() => Some(response.user.id),
            Ok(response) => {
                self.observer.observe(ResetDiagnostic::UserLookupFailed {
                    username: username.to_string(),
                    status: Some(response.status),
                    error: None,
                });
                None
            }
            Err(err) => {
                self.observer.observe(ResetDiagnostic::UserLookupFailed {
                    username: username.to_string(),
                    status: None,
                    error: Some(err.to_string()),
                });
                None
            }
        }
    }
}

/// Content writes only; creates, renames and metadata changes are not writes.
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

fn is_reset_file(path: &Path, marker: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(marker))
}
