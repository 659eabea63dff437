//! # resetwatch core
//!
//! Relays password reset requests from an identity service to users.
//!
//! The identity service writes a `passwordreset-*.json` file whenever a user
//! asks for a reset. [`fs_watch::DirectoryWatcher`] subscribes to the
//! directory those files land in and feeds every notification to an
//! [`fs_watch::EventProcessor`], which decodes the file, rejects expired
//! requests, resolves the user and hands a rendered message to the delivery
//! channel. Administrators can also create a reset without any file through
//! [`generator::InternalResetGenerator`].
//!
//! Everything outside that pipeline (user directory, message rendering and
//! delivery, address lookup) is reached through the traits in [`ports`].
//!
//! ## Modules
//!
//! - [`record`]: reset records and the reset file wire format
//! - [`pin`]: PIN generation
//! - [`generator`]: admin-initiated resets and reset links
//! - [`fs_watch`]: directory watcher and event processor
//! - [`observer`]: diagnostics sink injected into the pipeline

pub mod error;
pub mod fs_watch;
pub mod generator;
pub mod observer;
pub mod pin;
pub mod ports;
pub mod record;

pub use error::{ResetError, Result};
pub use fs_watch::{
    DirectoryWatcher, EventOutcome, EventProcessor, ProcessorSettings, ResetServices,
    WatchSettings,
};
pub use generator::{InternalResetGenerator, ResetLinkBuilder};
pub use observer::{ResetDiagnostic, ResetObserver, TracingObserver};
pub use ports::{
    AddressBook, DirectoryResponse, DirectoryUser, ResetMessage, ResetNotifier, ResetPath,
    UserDirectory,
};
pub use record::{ExternalReset, InternalReset, ResetFile, ResetRecord};
