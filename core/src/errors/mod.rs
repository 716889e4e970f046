//! Error taxonomy for the OTP flow and the session store.

mod response;


use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a send request was throttled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitReason {
    /// The phone used up its request budget for the sliding window
    TooManyRequests,
    /// The previous request for the phone is too recent
    Cooldown,
    /// A third-party provider throttled the request
    ProviderThrottled,
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitReason::TooManyRequests => write!(f, "too many requests"),
            RateLimitReason::Cooldown => write!(f, "cooldown"),
            RateLimitReason::ProviderThrottled => write!(f, "provider throttled"),
        }
    }
}

/// Errors surfaced by the OTP services
///
/// Each variant maps to a distinct user-facing message and error code,
/// see [`OtpError::user_message`] and [`OtpError::error_code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Rate limit exceeded ({reason}), retry after {retry_after_seconds} seconds")]
    RateLimited {
        retry_after_seconds: u64,
        reason: RateLimitReason,
    },

    #[error("OTP session not found")]
    SessionNotFound,

    #[error("OTP session expired")]
    SessionExpired,

    #[error("OTP mismatch")]
    OtpMismatch { remaining_attempts: Option<u32> },

    #[error("Maximum verification attempts exceeded")]
    TooManyAttempts,

    #[error("Invalid phone format: {phone}")]
    InvalidPhone { phone: String },

    #[error("Code delivery failed: {message}")]
    DeliveryFailed { message: String },

    #[error("OTP provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },
}

impl OtpError {
    /// Whether the same caller can retry with the same session
    pub fn is_retryable(&self) -> bool {
        matches!(self, OtpError::OtpMismatch { .. })
    }

    /// Seconds to wait before asking for a new code, if throttled
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            OtpError::RateLimited { retry_after_seconds, .. } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

/// Errors reported by a session store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("Transaction conflict: {message}")]
    Conflict { message: String },
}

impl StorageError {
    /// Create an unavailable error from any displayable cause
    pub fn unavailable(cause: impl std::fmt::Display) -> Self {
        StorageError::Unavailable {
            message: cause.to_string(),
        }
    }

    /// Collisions and conflicts are resolved by running the transaction again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::DuplicateKey { .. } | StorageError::Conflict { .. }
        )
    }
}

/// Why an SMS channel could not deliver a code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel refuses the destination number
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The channel refused the message itself; resending will not help
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The channel could not be reached or gave up after retrying
    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for OtpError {
    fn from(err: StorageError) -> Self {
        OtpError::StorageUnavailable {
            message: err.to_string(),
        }
    }
}

pub type OtpResult<T> = Result<T, OtpError>;
pub type DeliveryResult<T> = Result<T, DeliveryError>;
pub type StorageResult<T> = Result<T, StorageError>;
