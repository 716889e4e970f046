//! Code verification against stored sessions

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use otp_shared::config::OtpConfig;
use otp_shared::utils::mask_phone_number;

use crate::domain::entities::OtpSession;
use crate::errors::{OtpError, OtpResult};
use crate::repositories::OtpSessionRepository;

use super::types::VerifiedSession;

/// Checks submitted codes and consumes sessions on success
pub struct VerificationEngine<R: OtpSessionRepository + 'static> {
    repository: Arc<R>,
    expiry_minutes: i64,
    max_attempts: u32,
}

impl<R: OtpSessionRepository + 'static> VerificationEngine<R> {
    pub fn new(repository: Arc<R>, config: &OtpConfig) -> Self {
        Self {
            repository,
            expiry_minutes: config.expiry_minutes,
            max_attempts: config.max_verify_attempts,
        }
    }

    /// Verify `submitted` against the session
    ///
    /// # Returns
    /// * `Ok(VerifiedSession)` - Code matched; the session is gone
    /// * `Err(OtpError::SessionNotFound)` - No such session, or it was consumed
    ///   or replaced concurrently
    /// * `Err(OtpError::SessionExpired)` - Session outlived its lifetime; it is deleted
    /// * `Err(OtpError::OtpMismatch)` - Wrong code; the session stays usable
    /// * `Err(OtpError::TooManyAttempts)` - Wrong-code budget spent; the session is deleted
    pub async fn verify(&self, session_id: &str, submitted: &str) -> OtpResult<VerifiedSession> {
        let session = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or(OtpError::SessionNotFound)?;

        let now = Utc::now();
        if session.is_expired_at(now, self.expiry_minutes) {
            self.repository.delete_by_id(session_id).await?;
            info!(
                phone = %mask_phone_number(&session.phone),
                session_id = %session_id,
                event = "otp_session_expired",
                "OTP session expired"
            );
            return Err(OtpError::SessionExpired);
        }

        if !session.matches_code(submitted) {
            return self.reject(&session).await;
        }

        let cutoff = OtpSession::expiry_cutoff(now, self.expiry_minutes);
        if !self.repository.consume(session_id, &session.otp, cutoff).await? {
            debug!(
                session_id = %session_id,
                event = "otp_session_consume_lost",
                "OTP session consumed or replaced concurrently"
            );
            return Err(OtpError::SessionNotFound);
        }

        info!(
            phone = %mask_phone_number(&session.phone),
            session_id = %session_id,
            event = "otp_verified",
            "OTP verified"
        );

        Ok(VerifiedSession {
            session_id: session.session_id,
            phone: session.phone,
            verified_at: now,
        })
    }

    async fn reject(&self, session: &OtpSession) -> OtpResult<VerifiedSession> {
        let attempts = self
            .repository
            .record_failed_attempt(&session.session_id)
            .await?
            .ok_or(OtpError::SessionNotFound)?;

        if self.max_attempts > 0 && attempts >= self.max_attempts {
            self.repository.delete_by_id(&session.session_id).await?;
            warn!(
                phone = %mask_phone_number(&session.phone),
                session_id = %session.session_id,
                attempts = attempts,
                event = "otp_attempts_exhausted",
                "OTP session deleted after too many wrong codes"
            );
            return Err(OtpError::TooManyAttempts);
        }

        let remaining_attempts = (self.max_attempts > 0).then(|| self.max_attempts - attempts);
        info!(
            phone = %mask_phone_number(&session.phone),
            session_id = %session.session_id,
            attempts = attempts,
            event = "otp_mismatch",
            "Wrong OTP submitted"
        );
        Err(OtpError::OtpMismatch { remaining_attempts })
    }
}
