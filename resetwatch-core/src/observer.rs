//! Diagnostics emitted by the watcher and processor.
//!
//! Components never log directly; they hand a [`ResetDiagnostic`] to the
//! [`ResetObserver`] they were constructed with. [`TracingObserver`] is the
//! production sink.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Daemon name used in watcher start/failure diagnostics.
pub const DAEMON_NAME: &str = "PWR";

/// Every distinct outcome the reset pipeline reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetDiagnostic {
    /// The watcher is about to subscribe to a directory.
    WatcherStarting {
        /// Directory being watched.
        path: PathBuf,
    },
    /// The configured directory does not exist; the watcher will not start.
    PathNotFound {
        /// Missing directory.
        path: PathBuf,
    },
    /// Creating or registering the watch subscription failed.
    DaemonFailed {
        /// Underlying failure.
        error: String,
    },
    /// The subscription reported an error, or the processor task ended abnormally.
    WatcherError {
        /// Underlying failure.
        error: String,
    },
    /// Notifications are switched off; the processor exited without listening.
    ProcessorDisabled,
    /// The processor is listening for events.
    ProcessorStarted,
    /// The processor loop ended.
    ProcessorStopped,
    /// A reset file could not be read.
    ReadFailed {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        error: String,
    },
    /// A reset file could not be decoded.
    DecodeFailed {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        error: String,
    },
    /// A decoded record entered dispatch.
    ResetRequested {
        /// Account named in the record.
        username: String,
    },
    /// The record had already expired.
    Expired {
        /// Account named in the record.
        username: String,
        /// When it expired.
        expiry: DateTime<Utc>,
    },
    /// The user could not be resolved by name.
    UserLookupFailed {
        /// Account named in the record.
        username: String,
        /// Status from the directory, when it answered.
        status: Option<u16>,
        /// Transport failure, when it did not.
        error: Option<String>,
    },
    /// Rendering the message failed.
    ConstructFailed {
        /// Account named in the record.
        username: String,
        /// Underlying failure.
        error: String,
    },
    /// Delivering the message failed.
    SendFailed {
        /// Account named in the record.
        username: String,
        /// Address or name the message was meant for.
        recipient: String,
        /// Underlying failure.
        error: String,
    },
    /// The message was handed to the delivery channel.
    Sent {
        /// Account named in the record.
        username: String,
        /// Address or name it went to.
        recipient: String,
    },
}

/// Sink for pipeline diagnostics, injected into the watcher and processor.
pub trait ResetObserver: Send + Sync {
    /// Record one diagnostic. Must not block.
    fn observe(&self, diagnostic: ResetDiagnostic);
}

/// Forwards diagnostics to `tracing`, one distinct message per class.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResetObserver for TracingObserver {
    fn observe(&self, diagnostic: ResetDiagnostic) {
        match diagnostic {
            ResetDiagnostic::WatcherStarting { path } => {
                info!(daemon = DAEMON_NAME, path = %path.display(), "starting daemon")
            }
            ResetDiagnostic::PathNotFound { path } => error!(
                daemon = DAEMON_NAME,
                path = %path.display(),
                "failed to start daemon: path not found"
            ),
            ResetDiagnostic::DaemonFailed { error } => {
                error!(daemon = DAEMON_NAME, %error, "failed to start daemon")
            }
            ResetDiagnostic::WatcherError { error } => {
                error!(daemon = DAEMON_NAME, %error, "watcher reported an error")
            }
            ResetDiagnostic::ProcessorDisabled => {
                debug!(daemon = DAEMON_NAME, "notifications disabled, not processing resets")
            }
            ResetDiagnostic::ProcessorStarted => {
                debug!(daemon = DAEMON_NAME, "reset processor running")
            }
            ResetDiagnostic::ProcessorStopped => {
                debug!(daemon = DAEMON_NAME, "reset processor stopped")
            }
            ResetDiagnostic::ReadFailed { path, error } => {
                debug!(path = %path.display(), %error, "failed reading reset file")
            }
            ResetDiagnostic::DecodeFailed { path, error } => {
                debug!(path = %path.display(), %error, "failed decoding reset file")
            }
            ResetDiagnostic::ResetRequested { username } => {
                info!(%username, "new password reset for user")
            }
            ResetDiagnostic::Expired { username, expiry } => {
                error!(%username, %expiry, "password reset has already expired")
            }
            ResetDiagnostic::UserLookupFailed {
                username,
                status,
                error,
            } => error!(
                %username,
                status = ?status,
                error = error.as_deref().unwrap_or("user not found"),
                "failed to get user from identity service"
            ),
            ResetDiagnostic::ConstructFailed { username, error } => {
                error!(%username, %error, "failed to construct password reset message")
            }
            ResetDiagnostic::SendFailed {
                username,
                recipient,
                error,
            } => error!(
                %username,
                %recipient,
                %error,
                "failed to send password reset message"
            ),
            ResetDiagnostic::Sent {
                username,
                recipient,
            } => info!(%username, %recipient, "sent password reset message"),
        }
    }
}
