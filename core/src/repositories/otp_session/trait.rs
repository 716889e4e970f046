//! Session store trait for OTP sessions and the request log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::OtpSession;
use crate::errors::StorageResult;

/// Repository trait for [`OtpSession`] persistence
///
/// The store is the single source of truth shared by every server instance.
/// Implementations must make each method a single atomic statement or
/// transaction; the services rely on that for the single-session and
/// single-use guarantees.
#[async_trait]
pub trait OtpSessionRepository: Send + Sync {
    /// Replace every session for the phone with `session` and append a
    /// request-log entry, in one transaction
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of previous sessions removed
    /// * `Err(StorageError::DuplicateKey)` - `session_id` already taken
    /// * `Err(StorageError::Conflict)` - Transaction lost a race and can be retried
    /// * `Err(StorageError::Unavailable)` - Store unreachable
    async fn replace_for_phone(&self, session: &OtpSession) -> StorageResult<u64>;

    /// Find a session by its id
    async fn find_by_id(&self, session_id: &str) -> StorageResult<Option<OtpSession>>;

    /// Delete the session only if it still holds `otp` and was created at or
    /// after `not_before`
    ///
    /// # Returns
    /// * `Ok(true)` - This caller consumed the session
    /// * `Ok(false)` - The session was already consumed, replaced or expired
    async fn consume(
        &self,
        session_id: &str,
        otp: &str,
        not_before: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Increment the wrong-code counter
    ///
    /// # Returns
    /// * `Ok(Some(n))` - Counter value after the increment
    /// * `Ok(None)` - Session no longer exists
    async fn record_failed_attempt(&self, session_id: &str) -> StorageResult<Option<u32>>;

    /// Delete a session by id, returns whether a row was removed
    async fn delete_by_id(&self, session_id: &str) -> StorageResult<bool>;

    /// Delete every session for a phone, returns the number of rows removed
    async fn delete_by_phone(&self, phone: &str) -> StorageResult<u64>;

    /// Number of session rows currently stored for a phone
    async fn count_by_phone(&self, phone: &str) -> StorageResult<u64>;

    /// Creation times of requests for `phone` at or after `since`, oldest first
    async fn request_times_since(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DateTime<Utc>>>;

    /// Delete every session created before `cutoff`
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    /// Delete request-log entries recorded before `cutoff`
    async fn prune_request_log(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}
