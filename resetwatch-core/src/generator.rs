//! Administrator-initiated resets and reset links.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::error::{ResetError, Result};
use crate::pin::generate_pin;
use crate::ports::{ResetNotifier, ResetPath, UserDirectory};
use crate::record::{InternalReset, ResetRecord};

/// How long an internally generated reset stays valid.
pub const INTERNAL_RESET_LIFETIME_MINUTES: i64 = 30;

/// Builds user-facing reset links from a configured base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetLinkBuilder {
    url_base: Option<String>,
}

impl ResetLinkBuilder {
    /// Blank or missing bases leave link generation disabled.
    pub fn new(url_base: Option<String>) -> Self {
        let url_base = url_base
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        Self { url_base }
    }

    /// `false` when no URL base is configured.
    pub fn is_enabled(&self) -> bool {
        self.url_base.is_some()
    }

    /// `{base}/reset?pin={pin}` with the PIN percent-encoded.
    pub fn link(&self, pin: &str) -> Result<String> {
        let base = self.url_base.as_deref().ok_or(ResetError::MissingUrlBase)?;
        Ok(format!("{base}/reset?pin={}", urlencoding::encode(pin)))
    }
}

/// Creates resets on behalf of an administrator, without any reset file.
#[derive(Clone)]
pub struct InternalResetGenerator {
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn ResetNotifier>,
    links: ResetLinkBuilder,
    lifetime: Duration,
}

impl fmt::Debug for InternalResetGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalResetGenerator")
            .field("links", &self.links)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl InternalResetGenerator {
    /// Generator with the default 30 minute lifetime.
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn ResetNotifier>,
        links: ResetLinkBuilder,
    ) -> Self {
        Self {
            directory,
            notifier,
            links,
            lifetime: Duration::minutes(INTERNAL_RESET_LIFETIME_MINUTES),
        }
    }

    /// Override how long generated resets stay valid.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Generate a reset for `user_id`. Lookup failures are returned, never logged.
    pub async fn gen_internal_reset(&self, user_id: &str) -> Result<ResetRecord> {
        let response = self.directory.user_by_id(user_id).await?;
        if !response.is_found_by_id() {
            return Err(ResetError::UserLookup {
                user: user_id.to_string(),
                status: response.status,
            });
        }

        let pin = generate_pin()?;
        Ok(ResetRecord::Internal(InternalReset::new(
            pin,
            response.user.name,
            user_id,
            Utc::now() + self.lifetime,
        )))
    }

    /// Reset link for `pin`, or [`ResetError::MissingUrlBase`].
    pub fn gen_reset_link(&self, pin: &str) -> Result<String> {
        self.links.link(pin)
    }

    /// Generate a reset and deliver it straight away through the admin path.
    pub async fn send_internal_reset(&self, user_id: &str) -> Result<ResetRecord> {
        let record = self.gen_internal_reset(user_id).await?;
        let message = self
            .notifier
            .construct_reset(&record, ResetPath::Admin)
            .await?;
        self.notifier.send_by_id(&message, user_id).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{
        DirectoryResponse, DirectoryUser, MockResetNotifier, MockUserDirectory, ResetMessage,
    };

    fn generator(directory: MockUserDirectory, notifier: MockResetNotifier) -> InternalResetGenerator {
        InternalResetGenerator::new(
            Arc::new(directory),
            Arc::new(notifier),
            ResetLinkBuilder::new(Some("https://host/app".to_string())),
        )
    }

    fn found(id: &str, name: &str) -> DirectoryResponse {
        DirectoryResponse::new(
            DirectoryUser {
                id: id.to_string(),
                name: name.to_string(),
            },
            200,
        )
    }

    #[test]
    fn link_embeds_pin() {
        let links = ResetLinkBuilder::new(Some("https://host/app".to_string()));
        assert_eq!(links.link("abc123").unwrap(), "https://host/app/reset?pin=abc123");

        let trailing = ResetLinkBuilder::new(Some("https://host/app/".to_string()));
        assert_eq!(
            trailing.link("abc123").unwrap(),
            "https://host/app/reset?pin=abc123"
        );
    }

    #[test]
    fn link_without_base_is_a_config_error() {
        for links in [
            ResetLinkBuilder::new(None),
            ResetLinkBuilder::new(Some("   ".to_string())),
        ] {
            assert!(!links.is_enabled());
            let err = links.link("abc123").unwrap_err();
            assert!(matches!(err, ResetError::MissingUrlBase));
            assert!(err.to_string().contains("url_base"));
        }
    }

    #[tokio::test]
    async fn internal_reset_uses_resolved_user() -> anyhow::Result<()> {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_user_by_id()
            .once()
            .withf(|id| id == "u-1")
            .returning(|_| Ok(found("u-1", "alice")));
        directory.expect_user_by_name().never();

        let before = Utc::now();
        let record = generator(directory, MockResetNotifier::new())
            .gen_internal_reset("u-1")
            .await?;

        assert!(record.is_internal());
        assert_eq!(record.username(), "alice");
        assert_eq!(record.user_id(), Some("u-1"));
        assert!(!record.pin().is_empty());
        assert!(record.expiry() >= before + Duration::minutes(30));
        assert!(record.expiry() <= Utc::now() + Duration::minutes(30));
        Ok(())
    }

    #[tokio::test]
    async fn internal_reset_fails_on_lookup_status() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_user_by_id()
            .once()
            .returning(|_| Ok(DirectoryResponse::not_found()));

        let result = generator(directory, MockResetNotifier::new())
            .gen_internal_reset("missing")
            .await;

        assert!(matches!(
            result,
            Err(ResetError::UserLookup { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn internal_reset_fails_on_lookup_error() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_user_by_id()
            .once()
            .returning(|_| Err(ResetError::Directory("connection refused".to_string())));

        let result = generator(directory, MockResetNotifier::new())
            .gen_internal_reset("u-1")
            .await;

        assert!(matches!(result, Err(ResetError::Directory(_))));
    }

    #[tokio::test]
    async fn send_internal_reset_skips_second_lookup() -> anyhow::Result<()> {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_user_by_id()
            .once()
            .returning(|_| Ok(found("u-9", "dave")));
        directory.expect_user_by_name().never();

        let mut notifier = MockResetNotifier::new();
        notifier
            .expect_construct_reset()
            .once()
            .withf(|record, path| record.username() == "dave" && *path == ResetPath::Admin)
            .returning(|_, _| {
                Ok(ResetMessage {
                    subject: "reset".to_string(),
                    ..ResetMessage::default()
                })
            });
        notifier
            .expect_send_by_id()
            .once()
            .withf(|message, id| message.subject == "reset" && id == "u-9")
            .returning(|_, _| Ok(()));

        let record = generator(directory, notifier).send_internal_reset("u-9").await?;
        assert_eq!(record.user_id(), Some("u-9"));
        Ok(())
    }

    #[tokio::test]
    async fn send_internal_reset_surfaces_delivery_error() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_user_by_id()
            .returning(|_| Ok(found("u-9", "dave")));

        let mut notifier = MockResetNotifier::new();
        notifier
            .expect_construct_reset()
            .returning(|_, _| Ok(ResetMessage::default()));
        notifier
            .expect_send_by_id()
            .once()
            .returning(|_, _| Err(ResetError::Delivery("smtp down".to_string())));

        let result = generator(directory, notifier).send_internal_reset("u-9").await;
        assert!(matches!(result, Err(ResetError::Delivery(_))));
    }
}
