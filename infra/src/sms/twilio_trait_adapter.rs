//! Twilio SMS Service Trait Adapter
//!
//! Implements the core `SmsServiceTrait` on top of [`TwilioSmsService`] so the
//! custom OTP provider can deliver codes through Twilio.

use async_trait::async_trait;

use otp_core::errors::{DeliveryError, DeliveryResult};
use otp_core::services::otp::SmsServiceTrait;
use otp_shared::config::TwilioCredentials;

use crate::sms::sms_service::{is_valid_phone_number, verification_message, SmsService};
use crate::sms::twilio::TwilioSmsService;

/// Adapter that implements the core SmsServiceTrait for Twilio
pub struct TwilioSmsServiceAdapter {
    inner: TwilioSmsService,
    expiry_minutes: i64,
}

impl TwilioSmsServiceAdapter {
    pub fn new(
        config: TwilioCredentials,
        expiry_minutes: i64,
    ) -> Result<Self, crate::InfrastructureError> {
        let inner = TwilioSmsService::new(config)?;
        Ok(Self {
            inner,
            expiry_minutes,
        })
    }
}

#[async_trait]
impl SmsServiceTrait for TwilioSmsServiceAdapter {
    async fn send_verification_code(&self, phone: &str, code: &str) -> DeliveryResult<String> {
        self.inner
            .send_sms(phone, &verification_message(code, self.expiry_minutes))
            .await
            .map_err(DeliveryError::from)
    }

    fn is_valid_phone_number(&self, phone: &str) -> bool {
        is_valid_phone_number(phone)
    }
}
