//! Session creation and removal

use rand::{rngs::OsRng, Rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use otp_shared::config::OtpConfig;
use otp_shared::utils::mask_phone_number;

use crate::domain::entities::OtpSession;
use crate::errors::{OtpResult, StorageError};
use crate::repositories::OtpSessionRepository;

use super::code_generator::CodeGenerator;
use super::types::IssuedSession;

/// Upper bound on transactions attempted for one create request
pub const MAX_CREATE_RETRIES: u32 = 5;

/// Base delay before retrying a conflicted transaction
const CONFLICT_BACKOFF_BASE_MS: u64 = 10;

/// Exponential delay with full jitter
fn conflict_backoff(attempt: u32) -> Duration {
    let ceiling = CONFLICT_BACKOFF_BASE_MS << attempt.min(6);
    Duration::from_millis(OsRng.gen_range(CONFLICT_BACKOFF_BASE_MS..=ceiling))
}

/// Creates sessions so that each phone holds at most one
pub struct SessionLifecycleManager<R: OtpSessionRepository + 'static> {
    repository: Arc<R>,
    generator: CodeGenerator,
}

impl<R: OtpSessionRepository + 'static> SessionLifecycleManager<R> {
    pub fn new(repository: Arc<R>, config: &OtpConfig) -> Self {
        Self {
            repository,
            generator: CodeGenerator::new(config.code_length),
        }
    }

    /// Issue a new code for `phone`, replacing any pending one
    ///
    /// Id collisions and transaction conflicts are retried with a fresh
    /// session up to [`MAX_CREATE_RETRIES`] times. Other storage failures are
    /// returned as `StorageUnavailable`.
    pub async fn create_or_replace(&self, phone: &str) -> OtpResult<IssuedSession> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let session = OtpSession::new(phone, self.generator.generate());

            match self.repository.replace_for_phone(&session).await {
                Ok(superseded) => {
                    info!(
                        phone = %mask_phone_number(phone),
                        session_id = %session.session_id,
                        superseded = superseded,
                        event = "otp_session_created",
                        "OTP session created"
                    );
                    return Ok(IssuedSession::from_session(session, superseded));
                }
                Err(e) if e.is_retryable() && attempt < MAX_CREATE_RETRIES => {
                    debug!(
                        phone = %mask_phone_number(phone),
                        attempt = attempt,
                        error = %e,
                        event = "otp_session_create_retry",
                        "Retrying OTP session creation"
                    );
                    if matches!(e, StorageError::Conflict { .. }) {
                        tokio::time::sleep(conflict_backoff(attempt)).await;
                    }
                }
                Err(e) => {
                    error!(
                        phone = %mask_phone_number(phone),
                        attempts = attempt,
                        error = %e,
                        event = "otp_session_create_failed",
                        "Failed to create OTP session"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    /// Remove one session, returns whether it existed
    pub async fn delete_by_id(&self, session_id: &str) -> OtpResult<bool> {
        Ok(self.repository.delete_by_id(session_id).await?)
    }

    /// Remove every session for a phone
    pub async fn delete_by_phone(&self, phone: &str) -> OtpResult<u64> {
        let deleted = self.repository.delete_by_phone(phone).await?;
        debug!(
            phone = %mask_phone_number(phone),
            deleted = deleted,
            event = "otp_sessions_deleted",
            "Deleted OTP sessions for phone"
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_backoff_stays_in_range() {
        for attempt in 1..MAX_CREATE_RETRIES {
            let ceiling = CONFLICT_BACKOFF_BASE_MS << attempt;
            for _ in 0..50 {
                let delay = conflict_backoff(attempt).as_millis() as u64;
                assert!((CONFLICT_BACKOFF_BASE_MS..=ceiling).contains(&delay));
            }
        }
    }

    #[test]
    fn test_conflict_backoff_is_jittered() {
        let delays: std::collections::HashSet<_> =
            (0..50).map(|_| conflict_backoff(4)).collect();
        assert!(delays.len() > 1);
    }
}
