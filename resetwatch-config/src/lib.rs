//! Host configuration for resetwatch: the on-disk model, the environment
//! aware loader and non-fatal validation warnings.

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigSource};
pub use models::{Config, DirectoryConfig, NotificationConfig, PasswordResetConfig};
pub use validation::{ConfigWarning, ConfigWarnings, validate};
