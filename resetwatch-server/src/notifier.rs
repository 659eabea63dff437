//! Local delivery channel: renders reset messages and spools them to disk.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resetwatch_core::record::format_expiration;
use resetwatch_core::{ResetLinkBuilder, ResetMessage, ResetNotifier, ResetPath, ResetRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const SUBJECT: &str = "Password reset";

/// One message as written to the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpooledMessage {
    pub user_id: String,
    pub spooled_at: DateTime<Utc>,
    pub message: ResetMessage,
}

/// Writes each message to `<outbox>/<user_id>-<uuid>.json` for a mail
/// relay to pick up.
#[derive(Debug, Clone)]
pub struct SpoolNotifier {
    outbox: PathBuf,
    links: ResetLinkBuilder,
}

impl SpoolNotifier {
    pub fn new(outbox: impl Into<PathBuf>, links: ResetLinkBuilder) -> Self {
        Self {
            outbox: outbox.into(),
            links,
        }
    }

    fn render_text(&self, record: &ResetRecord, link: Option<&str>) -> String {
        let expiry = format_expiration(record.expiry());
        match link {
            Some(link) => format!(
                "Hi {name},\n\nAn administrator started a password reset for your account.\n\
                 Open {link} to choose a new password.\n\n\
                 The link expires at {expiry}.\n",
                name = record.username(),
            ),
            None => format!(
                "Hi {name},\n\nSomeone asked to reset the password for your account.\n\
                 Your reset PIN is {pin}\n\n\
                 The PIN expires at {expiry}. If you did not ask for this, ignore this message.\n",
                name = record.username(),
                pin = record.pin(),
            ),
        }
    }
}

/// Keeps ids usable as file name components.
fn file_stem(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ResetNotifier for SpoolNotifier {
    async fn construct_reset(
        &self,
        record: &ResetRecord,
        path: ResetPath,
    ) -> resetwatch_core::Result<ResetMessage> {
        // Admin resets go out as a link whenever a URL base is configured.
        let link = match path {
            ResetPath::Admin if self.links.is_enabled() => Some(self.links.link(record.pin())?),
            _ => None,
        };

        let html = link
            .as_deref()
            .map(|link| format!("<p>Open <a href=\"{link}\">this link</a> to choose a new password.</p>"));

        Ok(ResetMessage {
            subject: SUBJECT.to_string(),
            text: self.render_text(record, link.as_deref()),
            html,
        })
    }

    async fn send_by_id(
        &self,
        message: &ResetMessage,
        user_id: &str,
    ) -> resetwatch_core::Result<()> {
        tokio::fs::create_dir_all(&self.outbox).await?;

        let spooled = SpooledMessage {
            user_id: user_id.to_string(),
            spooled_at: Utc::now(),
            message: message.clone(),
        };
        let target = self
            .outbox
            .join(format!("{}-{}.json", file_stem(user_id), Uuid::new_v4()));
        tokio::fs::write(&target, serde_json::to_vec_pretty(&spooled)?).await?;

        debug!(user_id, path = %target.display(), "reset message spooled");
        Ok(())
    }
}
