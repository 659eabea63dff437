//! # resetwatch server
//!
//! Host process wiring for the reset pipeline: a users file standing in for
//! the identity service's directory, and an outbox spool standing in for the
//! mail transport.

pub mod directory;
pub mod notifier;
pub mod watch;

pub use directory::{DirectoryFileError, FileDirectory};
pub use notifier::{SpoolNotifier, SpooledMessage};
pub use watch::run_watcher;
