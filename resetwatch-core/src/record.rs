//! Password reset records and their on-disk representation.
//!
//! The identity service drops `passwordreset-*.json` files into the watched
//! directory. Those decode into [`ResetRecord::External`]; administrator
//! initiated resets are created in-process as [`ResetRecord::Internal`] and
//! never touch the filesystem.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ResetError, Result};

/// A reset request generated inside the host, with the target user already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalReset {
    pin: String,
    username: String,
    user_id: String,
    expiry: DateTime<Utc>,
}

impl InternalReset {
    /// Build a reset for an already resolved user.
    pub fn new(
        pin: impl Into<String>,
        username: impl Into<String>,
        user_id: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            pin: pin.into(),
            username: username.into(),
            user_id: user_id.into(),
            expiry,
        }
    }

    /// Directory id of the target user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// A reset request read from a file; the user still has to be looked up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReset {
    pin: String,
    username: String,
    expiry: DateTime<Utc>,
}

impl ExternalReset {
    /// Build a reset that still needs a by-name lookup.
    pub fn new(pin: impl Into<String>, username: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            pin: pin.into(),
            username: username.into(),
            expiry,
        }
    }
}

/// A single password reset request, either admin-generated or file-sourced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRecord {
    /// Created by an administrator through the host.
    Internal(InternalReset),
    /// Decoded from a reset file.
    External(ExternalReset),
}

impl ResetRecord {
    /// Secret the user presents to complete the reset.
    pub fn pin(&self) -> &str {
        match self {
            ResetRecord::Internal(reset) => &reset.pin,
            ResetRecord::External(reset) => &reset.pin,
        }
    }

    /// Account name as the identity service knows it.
    pub fn username(&self) -> &str {
        match self {
            ResetRecord::Internal(reset) => &reset.username,
            ResetRecord::External(reset) => &reset.username,
        }
    }

    /// Instant after which the PIN is no longer valid.
    pub fn expiry(&self) -> DateTime<Utc> {
        match self {
            ResetRecord::Internal(reset) => reset.expiry,
            ResetRecord::External(reset) => reset.expiry,
        }
    }

    /// The resolved user ID. Only internal records know it up front.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ResetRecord::Internal(reset) => Some(reset.user_id()),
            ResetRecord::External(_) => None,
        }
    }

    /// `true` for administrator-created records.
    pub fn is_internal(&self) -> bool {
        matches!(self, ResetRecord::Internal(_))
    }

    /// A record can be acted on only while its expiry is strictly in the future.
    pub fn is_actionable_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry() > now
    }
}

/// Wire format of a `passwordreset-*.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetFile {
    /// Reset PIN.
    #[serde(rename = "Pin", default)]
    pub pin: String,
    /// Account name to look up.
    #[serde(rename = "UserName", default)]
    pub username: String,
    /// Expiry, RFC 3339 or offset-less UTC.
    #[serde(rename = "ExpirationDate", with = "expiration_date")]
    pub expiry: DateTime<Utc>,
    /// Parsed but not used for routing.
    #[serde(rename = "Internal", default, skip_serializing_if = "is_false")]
    pub internal: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ResetFile {
    /// Decode file contents into a record.
    ///
    /// Files never carry a resolved user ID, so the result is always
    /// [`ResetRecord::External`] even when the `Internal` flag is set.
    pub fn decode(bytes: &[u8]) -> Result<ResetRecord> {
        let file: ResetFile = serde_json::from_slice(bytes)?;
        file.into_record()
    }

    /// Validate the decoded fields and turn them into an external record.
    pub fn into_record(self) -> Result<ResetRecord> {
        if self.pin.is_empty() {
            return Err(ResetError::InvalidRecord("empty PIN".to_string()));
        }
        if self.username.is_empty() {
            return Err(ResetError::InvalidRecord("empty username".to_string()));
        }
        Ok(ResetRecord::External(ExternalReset::new(
            self.pin,
            self.username,
            self.expiry,
        )))
    }
}

impl From<&ResetRecord> for ResetFile {
    fn from(record: &ResetRecord) -> Self {
        Self {
            pin: record.pin().to_string(),
            username: record.username().to_string(),
            expiry: record.expiry(),
            internal: record.is_internal(),
        }
    }
}

mod expiration_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_expiration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_expiration(&raw).ok_or_else(|| {
            D::Error::custom(format!("unrecognised ExpirationDate \"{raw}\""))
        })
    }
}

/// Parse an `ExpirationDate` value. Offset-less timestamps are taken as UTC.
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp the way reset files store it.
pub fn format_expiration(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn decodes_identity_service_file() {
        let raw = br#"{"Pin":"a1b2c3","UserName":"alice","ExpirationDate":"2030-05-01T10:20:30.1234567Z"}"#;
        let record = ResetFile::decode(raw).expect("valid reset file");

        assert_eq!(record.pin(), "a1b2c3");
        assert_eq!(record.username(), "alice");
        assert!(!record.is_internal());
        assert_eq!(record.user_id(), None);
        assert_eq!(
            record.expiry().date_naive(),
            Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap().date_naive()
        );
    }

    #[test]
    fn offsetless_expiry_is_utc() {
        let raw = br#"{"Pin":"p","UserName":"bob","ExpirationDate":"2030-01-02T03:04:05"}"#;
        let record = ResetFile::decode(raw).expect("valid reset file");
        assert_eq!(
            record.expiry(),
            Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn internal_flag_in_file_still_decodes_external() {
        let raw = br#"{"Pin":"p","UserName":"bob","ExpirationDate":"2030-01-02T03:04:05Z","Internal":true}"#;
        let record = ResetFile::decode(raw).expect("valid reset file");
        assert!(matches!(record, ResetRecord::External(_)));
    }

    #[test]
    fn empty_pin_is_rejected() {
        let raw = br#"{"Pin":"","UserName":"alice","ExpirationDate":"2030-05-01T10:20:30Z"}"#;
        assert!(matches!(
            ResetFile::decode(raw),
            Err(ResetError::InvalidRecord(_))
        ));

        let missing = br#"{"UserName":"alice","ExpirationDate":"2030-05-01T10:20:30Z"}"#;
        assert!(matches!(
            ResetFile::decode(missing),
            Err(ResetError::InvalidRecord(_))
        ));
    }

    #[test]
    fn empty_username_is_rejected() {
        let raw = br#"{"Pin":"abc","UserName":"","ExpirationDate":"2030-05-01T10:20:30Z"}"#;
        assert!(matches!(
            ResetFile::decode(raw),
            Err(ResetError::InvalidRecord(_))
        ));
    }

    #[test]
    fn malformed_contents_are_rejected() {
        assert!(matches!(
            ResetFile::decode(b"not json at all"),
            Err(ResetError::Serialization(_))
        ));
        assert!(matches!(
            ResetFile::decode(br#"{"Pin":"abc","UserName":"a","ExpirationDate":"tomorrow"}"#),
            Err(ResetError::Serialization(_))
        ));
    }

    #[test]
    fn actionable_only_strictly_before_expiry() {
        let now = Utc::now();
        let record = ResetRecord::External(ExternalReset::new("pin", "alice", now));

        assert!(!record.is_actionable_at(now));
        assert!(!record.is_actionable_at(now + Duration::seconds(1)));
        assert!(record.is_actionable_at(now - Duration::seconds(1)));
    }

    #[test]
    fn internal_record_renders_with_flag() {
        let expiry = Utc.with_ymd_and_hms(2031, 2, 3, 4, 5, 6).unwrap();
        let record = ResetRecord::Internal(InternalReset::new("pin", "carol", "id-7", expiry));
        let file = ResetFile::from(&record);

        let json = serde_json::to_value(&file).expect("serializable");
        assert_eq!(json["Internal"], true);
        assert_eq!(json["ExpirationDate"], "2031-02-03T04:05:06Z");
        assert_eq!(format_expiration(expiry), "2031-02-03T04:05:06Z");

        let external = ResetRecord::External(ExternalReset::new("pin", "carol", expiry));
        let json = serde_json::to_value(ResetFile::from(&external)).expect("serializable");
        assert!(json.get("Internal").is_none());
    }
}
