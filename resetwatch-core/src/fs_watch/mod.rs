//! Filesystem watch pipeline for password reset files.
//!
//! A thin wrapper around `notify` that bridges raw notifications for a single
//! directory into two tokio channels (events and subscription errors) and
//! hands them to an [`EventProcessor`] running on its own task. The watcher
//! itself never filters or parses anything.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod processor;

pub use processor::{
    DEFAULT_FILE_MARKER, EventOutcome, EventProcessor, ProcessorSettings, ResetServices,
};

use crate::error::{ResetError, Result};
use crate::observer::{ResetDiagnostic, ResetObserver};

/// How long shutdown waits for the processor to drain before aborting it.
const PROCESSOR_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default bound on the event and error channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Adds a directory to an existing subscription.
type Registrar = fn(RecommendedWatcher, &Path) -> (RecommendedWatcher, Result<()>);

/// Where and how to watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchSettings {
    /// Directory the identity service writes reset files into.
    pub directory: PathBuf,
    /// Bound on each of the event and error channels.
    pub channel_capacity: usize,
}

impl WatchSettings {
    /// Settings for `directory` with the default channel capacity.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Owns the watch subscription for one directory.
pub struct DirectoryWatcher {
    settings: WatchSettings,
    processor: EventProcessor,
    observer: Arc<dyn ResetObserver>,
    registrar: Registrar,
}

impl fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("settings", &self.settings)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Watcher feeding `processor` with events for `settings.directory`.
    pub fn new(
        settings: WatchSettings,
        processor: EventProcessor,
        observer: Arc<dyn ResetObserver>,
    ) -> Self {
        Self {
            settings,
            processor,
            observer,
            registrar: register,
        }
    }

    /// Start watching and block until `shutdown` is cancelled.
    ///
    /// A missing directory or a subscription that cannot be created is
    /// reported through the observer and returned; the processor is not
    /// started in either case. A failed directory registration is reported
    /// but not returned: the processor stays up with nothing to do until
    /// shutdown.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let Self {
            settings,
            processor,
            observer,
            registrar,
        } = self;
        let path = settings.directory;

        observer.observe(ResetDiagnostic::WatcherStarting { path: path.clone() });

        if !is_directory(&path).await {
            observer.observe(ResetDiagnostic::PathNotFound { path: path.clone() });
            return Err(ResetError::PathNotFound(path));
        }

        let capacity = settings.channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<Event>(capacity);
        let (error_tx, error_rx) = mpsc::channel::<notify::Error>(capacity);

        let subscription = match spawn_blocking(move || create_subscription(event_tx, error_tx))
            .await
        {
            Ok(Ok(subscription)) => subscription,
            Ok(Err(err)) => {
                observer.observe(ResetDiagnostic::DaemonFailed {
                    error: err.to_string(),
                });
                return Err(err);
            }
            Err(join_err) => {
                let msg = format!("watcher initialization panicked: {join_err}");
                observer.observe(ResetDiagnostic::DaemonFailed { error: msg.clone() });
                return Err(ResetError::Internal(msg));
            }
        };

        let mut processor_task = tokio::spawn(processor.run(event_rx, error_rx));

        let watch_path = path.clone();
        let subscription = match spawn_blocking(move || registrar(subscription, &watch_path)).await
        {
            Ok((subscription, Ok(()))) => Some(subscription),
            Ok((subscription, Err(err))) => {
                observer.observe(ResetDiagnostic::DaemonFailed {
                    error: err.to_string(),
                });
                Some(subscription)
            }
            Err(join_err) => {
                observer.observe(ResetDiagnostic::DaemonFailed {
                    error: format!("watch registration panicked: {join_err}"),
                });
                None
            }
        };

        shutdown.cancelled().await;

        // Dropping the subscription closes both channels, which ends the processor loop.
        drop(subscription);
        match timeout(PROCESSOR_SHUTDOWN_GRACE, &mut processor_task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => observer.observe(ResetDiagnostic::WatcherError {
                error: format!("reset processor terminated abnormally: {join_err}"),
            }),
            Err(_) => {
                debug!(path = %path.display(), "reset processor still busy at shutdown, aborting");
                processor_task.abort();
            }
        }

        Ok(())
    }
}

async fn is_directory(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

fn create_subscription(
    event_tx: mpsc::Sender<Event>,
    error_tx: mpsc::Sender<notify::Error>,
) -> Result<RecommendedWatcher> {
    RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.blocking_send(event) {
                    debug!("reset watch event dropped, processor is gone: {}", err);
                }
            }
            Err(err) => {
                if error_tx.blocking_send(err).is_err() {
                    debug!("reset watch error dropped, processor is gone");
                }
            }
        },
        NotifyConfig::default(),
    )
    .map_err(ResetError::from)
}

fn register(
    mut subscription: RecommendedWatcher,
    path: &Path,
) -> (RecommendedWatcher, Result<()>) {
    let result = subscription
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|err| {
            ResetError::Internal(format!("failed to watch {}: {}", path.display(), err))
        });
    (subscription, result)
}
