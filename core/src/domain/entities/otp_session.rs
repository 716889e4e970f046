//! OTP session entity binding a phone number to an issued code.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use otp_shared::config::otp::MAX_EXPIRY_MINUTES;

/// A pending one-time code for a phone number
///
/// At most one session exists per phone. The row is written once on creation;
/// only `failed_attempts` changes afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSession {
    /// Opaque unique identifier handed back to the caller
    pub session_id: String,

    /// Canonical phone number (E.164) the code was issued for
    pub phone: String,

    /// The numeric code, stored as a string to keep leading zeros
    pub otp: String,

    /// Creation time; the sole basis for expiry and rate-limit windows
    pub created_at: DateTime<Utc>,

    /// Number of wrong codes submitted against this session
    #[serde(default)]
    pub failed_attempts: u32,
}

impl OtpSession {
    /// Creates a new session for `phone` with a fresh session id
    pub fn new(phone: impl Into<String>, otp: impl Into<String>) -> Self {
        Self {
            session_id: Self::new_session_id(),
            phone: phone.into(),
            otp: otp.into(),
            created_at: Utc::now(),
            failed_attempts: 0,
        }
    }

    /// Generates a new opaque session id
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Overrides the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Session lifetime, bounded to `0..=MAX_EXPIRY_MINUTES`
    pub fn lifetime(expiry_minutes: i64) -> Duration {
        Duration::minutes(expiry_minutes.clamp(0, MAX_EXPIRY_MINUTES))
    }

    /// Oldest `created_at` still valid at `now` for the given lifetime
    pub fn expiry_cutoff(now: DateTime<Utc>, expiry_minutes: i64) -> DateTime<Utc> {
        now - Self::lifetime(expiry_minutes)
    }

    /// Time at which this session stops being valid
    pub fn expires_at(&self, expiry_minutes: i64) -> DateTime<Utc> {
        self.created_at + Self::lifetime(expiry_minutes)
    }

    /// A session is expired once strictly more than `expiry_minutes` have
    /// elapsed since creation.
    pub fn is_expired_at(&self, now: DateTime<Utc>, expiry_minutes: i64) -> bool {
        now - self.created_at > Self::lifetime(expiry_minutes)
    }

    /// Checks expiry against the current time
    pub fn is_expired(&self, expiry_minutes: i64) -> bool {
        self.is_expired_at(Utc::now(), expiry_minutes)
    }

    /// Compares a submitted code in constant time
    pub fn matches_code(&self, submitted: &str) -> bool {
        self.otp.len() == submitted.len() && constant_time_eq(self.otp.as_bytes(), submitted.as_bytes())
    }
}

impl std::fmt::Debug for OtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpSession")
            .field("session_id", &self.session_id)
            .field("phone", &self.phone)
            .field("otp", &"******")
            .field("created_at", &self.created_at)
            .field("failed_attempts", &self.failed_attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = OtpSession::new("+911234567890", "482913");

        assert_eq!(session.phone, "+911234567890");
        assert_eq!(session.otp, "482913");
        assert_eq!(session.failed_attempts, 0);
        assert!(Uuid::parse_str(&session.session_id).is_ok());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = OtpSession::new("+911234567890", "111111");
        let b = OtpSession::new("+911234567890", "111111");
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let session = OtpSession::new("+911234567890", "482913")
            .with_created_at(now - Duration::seconds(60));

        // Exactly at the lifetime is still valid
        assert!(!session.is_expired_at(now, 1));
        assert!(session.is_expired_at(now + Duration::seconds(1), 1));
    }

    #[test]
    fn test_expired_after_61_seconds() {
        let session = OtpSession::new("+911234567890", "482913")
            .with_created_at(Utc::now() - Duration::seconds(61));
        assert!(session.is_expired(1));
    }

    #[test]
    fn test_expiry_cutoff_matches_is_expired() {
        let now = Utc::now();
        let cutoff = OtpSession::expiry_cutoff(now, 5);
        let at_cutoff = OtpSession::new("+911234567890", "1").with_created_at(cutoff);
        let before_cutoff = OtpSession::new("+911234567890", "1")
            .with_created_at(cutoff - Duration::milliseconds(1));

        assert!(!at_cutoff.is_expired_at(now, 5));
        assert!(before_cutoff.is_expired_at(now, 5));
    }

    #[test]
    fn test_oversized_lifetime_is_bounded() {
        let now = Utc::now();
        let session = OtpSession::new("+911234567890", "482913").with_created_at(now);

        assert_eq!(OtpSession::lifetime(i64::MAX), Duration::minutes(MAX_EXPIRY_MINUTES));
        assert_eq!(
            session.expires_at(i64::MAX / 2),
            now + Duration::minutes(MAX_EXPIRY_MINUTES)
        );
        assert!(!session.is_expired_at(now, i64::MAX));
        assert!(OtpSession::expiry_cutoff(now, i64::MAX) < now);
    }

    #[test]
    fn test_matches_code() {
        let session = OtpSession::new("+911234567890", "012345");
        assert!(session.matches_code("012345"));
        assert!(!session.matches_code("12345"));
        assert!(!session.matches_code("012346"));
        assert!(!session.matches_code(""));
    }

    #[test]
    fn test_debug_redacts_code() {
        let session = OtpSession::new("+911234567890", "482913");
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("482913"));
        assert!(rendered.contains("+911234567890"));
    }

    #[test]
    fn test_serialization() {
        let session = OtpSession::new("+911234567890", "482913");
        let json = serde_json::to_string(&session).unwrap();
        let deserialized: OtpSession = serde_json::from_str(&json).unwrap();
        assert_eq!(session, deserialized);
    }
}
