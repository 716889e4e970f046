//! Result types for the OTP services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::OtpSession;
use crate::errors::{OtpError, OtpResult, RateLimitReason};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether a new code may be issued
    pub allowed: bool,
    /// Why the request was denied
    pub reason: Option<RateLimitReason>,
    /// Seconds until the same request would be allowed (at least 1)
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
        }
    }

    pub fn deny(reason: RateLimitReason, retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            retry_after_seconds: Some(retry_after_seconds.max(1)),
        }
    }

    /// Convert a denial into `OtpError::RateLimited`
    pub fn into_result(self) -> OtpResult<()> {
        match (self.allowed, self.reason) {
            (true, _) => Ok(()),
            (false, reason) => Err(OtpError::RateLimited {
                retry_after_seconds: self.retry_after_seconds.unwrap_or(1),
                reason: reason.unwrap_or(RateLimitReason::TooManyRequests),
            }),
        }
    }
}

/// A freshly created session, including the code to deliver
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub session_id: String,
    pub phone: String,
    pub otp: String,
    pub created_at: DateTime<Utc>,
    /// Number of older sessions for the phone that this one replaced
    pub superseded: u64,
}

impl IssuedSession {
    pub(crate) fn from_session(session: OtpSession, superseded: u64) -> Self {
        Self {
            session_id: session.session_id,
            phone: session.phone,
            otp: session.otp,
            created_at: session.created_at,
            superseded,
        }
    }
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("session_id", &self.session_id)
            .field("phone", &self.phone)
            .field("otp", &"******")
            .field("created_at", &self.created_at)
            .field("superseded", &self.superseded)
            .finish()
    }
}

/// Proof that the caller controls `phone`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSession {
    pub session_id: String,
    pub phone: String,
    pub verified_at: DateTime<Utc>,
}

/// What a caller gets back from [`OtpProvider::send`](super::OtpProvider::send)
///
/// Never carries the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Id to submit together with the code
    pub session_id: String,
    pub phone: String,
    /// Name of the provider that issued the session
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Delivery id reported by the SMS channel, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}
