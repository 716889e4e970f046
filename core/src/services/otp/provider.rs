//! OTP provider backed by our own session store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use otp_shared::config::{OtpConfig, RateLimitConfig};
use otp_shared::utils::{is_canonical_phone, mask_phone_number, normalize_phone_number};

use crate::domain::entities::OtpSession;
use crate::errors::{DeliveryError, OtpError, OtpResult};
use crate::repositories::OtpSessionRepository;

use super::lifecycle::SessionLifecycleManager;
use super::rate_limiter::OtpRateLimiter;
use super::traits::{OtpProvider, SmsServiceTrait};
use super::types::{SessionHandle, VerifiedSession};
use super::verification::VerificationEngine;

pub const CUSTOM_PROVIDER_NAME: &str = "custom";

/// Issues codes from our store and delivers them through an SMS channel
pub struct CustomOtpProvider<R: OtpSessionRepository + 'static> {
    rate_limiter: OtpRateLimiter<R>,
    lifecycle: SessionLifecycleManager<R>,
    engine: VerificationEngine<R>,
    sms_service: Arc<dyn SmsServiceTrait>,
    expiry_minutes: i64,
}

impl<R: OtpSessionRepository + 'static> CustomOtpProvider<R> {
    pub fn new(
        repository: Arc<R>,
        sms_service: Arc<dyn SmsServiceTrait>,
        otp: &OtpConfig,
        rate_limit: &RateLimitConfig,
    ) -> Self {
        Self {
            rate_limiter: OtpRateLimiter::new(repository.clone(), rate_limit.clone()),
            lifecycle: SessionLifecycleManager::new(repository.clone(), otp),
            engine: VerificationEngine::new(repository, otp),
            sms_service,
            expiry_minutes: otp.expiry_minutes,
        }
    }

    pub fn lifecycle(&self) -> &SessionLifecycleManager<R> {
        &self.lifecycle
    }
}

#[async_trait]
impl<R: OtpSessionRepository + 'static> OtpProvider for CustomOtpProvider<R> {
    async fn send(&self, phone: &str) -> OtpResult<SessionHandle> {
        let canonical = normalize_phone_number(phone);
        if !is_canonical_phone(&canonical) || !self.sms_service.is_valid_phone_number(&canonical) {
            return Err(OtpError::InvalidPhone {
                phone: phone.to_string(),
            });
        }

        self.rate_limiter.check(&canonical).await.into_result()?;

        let issued = self.lifecycle.create_or_replace(&canonical).await?;

        let message_id = match self
            .sms_service
            .send_verification_code(&canonical, &issued.otp)
            .await
        {
            Ok(message_id) => message_id,
            Err(e) => {
                error!(
                    phone = %mask_phone_number(&canonical),
                    session_id = %issued.session_id,
                    error = %e,
                    event = "otp_delivery_failed",
                    "Failed to deliver OTP"
                );
                if let Err(cleanup) = self.lifecycle.delete_by_id(&issued.session_id).await {
                    error!(
                        session_id = %issued.session_id,
                        error = %cleanup,
                        "Failed to remove undelivered OTP session"
                    );
                }
                return Err(match e {
                    DeliveryError::InvalidRecipient(_) => OtpError::InvalidPhone {
                        phone: phone.to_string(),
                    },
                    other => OtpError::DeliveryFailed {
                        message: other.to_string(),
                    },
                });
            }
        };

        info!(
            phone = %mask_phone_number(&canonical),
            session_id = %issued.session_id,
            message_id = %message_id,
            event = "otp_sent",
            "OTP sent"
        );

        Ok(SessionHandle {
            session_id: issued.session_id,
            phone: issued.phone,
            provider: CUSTOM_PROVIDER_NAME.to_string(),
            expires_at: Some(issued.created_at + OtpSession::lifetime(self.expiry_minutes)),
            message_id: Some(message_id),
        })
    }

    async fn verify(&self, session_id: &str, code: &str) -> OtpResult<VerifiedSession> {
        self.engine.verify(session_id, code).await
    }

    fn provider_name(&self) -> &str {
        CUSTOM_PROVIDER_NAME
    }
}
