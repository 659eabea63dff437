//! Runs the reset watcher for the host process.

use anyhow::Context;
use resetwatch_core::{DirectoryWatcher, ResetError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run `watcher` until `shutdown` is cancelled.
///
/// A watcher that cannot start (missing directory, no subscription) leaves
/// the feature disabled for this run and is not an error for the host. The
/// failure itself has already been reported through the watcher's observer.
pub async fn run_watcher(
    watcher: DirectoryWatcher,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match watcher.run(shutdown).await {
        Ok(()) => Ok(()),
        Err(ResetError::PathNotFound(path)) => {
            warn!(path = %path.display(), "watch directory missing; reset file watcher is disabled");
            Ok(())
        }
        Err(ResetError::Watcher(err)) => {
            warn!(error = %err, "watch subscription unavailable; reset file watcher is disabled");
            Ok(())
        }
        Err(err) => Err(err).context("reset watcher stopped with an error"),
    }
}
