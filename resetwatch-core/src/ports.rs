//! Contracts for the collaborators the reset pipeline talks to.
//!
//! None of these are implemented by the core: the identity service backs
//! [`UserDirectory`], the host's messaging subsystem backs [`ResetNotifier`]
//! and [`AddressBook`].

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::ResetRecord;

/// HTTP-style status for a successful lookup.
pub const STATUS_OK: u16 = 200;
/// HTTP-style status the identity service may return for a by-name hit.
pub const STATUS_NO_CONTENT: u16 = 204;

/// A user as the identity service describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Stable directory id.
    pub id: String,
    /// Account name.
    pub name: String,
}

/// A directory answer together with the status the identity service reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryResponse {
    /// Matched user, empty when nothing matched.
    pub user: DirectoryUser,
    /// HTTP-style status of the lookup.
    pub status: u16,
}

impl DirectoryResponse {
    /// Response carrying `user` with the given status.
    pub fn new(user: DirectoryUser, status: u16) -> Self {
        Self { user, status }
    }

    /// Empty response with status 404.
    pub fn not_found() -> Self {
        Self {
            user: DirectoryUser::default(),
            status: 404,
        }
    }

    /// By-id lookups succeed only with 200.
    pub fn is_found_by_id(&self) -> bool {
        self.status == STATUS_OK
    }

    /// By-name lookups succeed with 200 or 204 and a non-empty id.
    pub fn is_found_by_name(&self) -> bool {
        matches!(self.status, STATUS_OK | STATUS_NO_CONTENT) && !self.user.id.is_empty()
    }
}

/// User lookups against the identity service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by directory id.
    async fn user_by_id(&self, user_id: &str) -> Result<DirectoryResponse>;
    /// Look a user up by account name.
    async fn user_by_name(&self, username: &str) -> Result<DirectoryResponse>;
}

/// Which path produced the record being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetPath {
    /// Administrator-triggered reset from inside the host.
    Admin,
    /// Reset file written by the identity service.
    File,
}

/// A rendered notification, ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// Optional HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Renders and delivers reset messages.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Render the message for a record.
    async fn construct_reset(&self, record: &ResetRecord, path: ResetPath) -> Result<ResetMessage>;
    /// Deliver a rendered message to a user.
    async fn send_by_id(&self, message: &ResetMessage, user_id: &str) -> Result<()>;
}

/// Resolves where a user's messages go.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Delivery address (or contact name) for a user. Empty means undeliverable.
    async fn address_or_name(&self, user_id: &str) -> String;
}
