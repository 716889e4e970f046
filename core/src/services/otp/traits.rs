//! Traits for code delivery and OTP providers

use async_trait::async_trait;

use crate::errors::{DeliveryResult, OtpResult};

use super::types::{SessionHandle, VerifiedSession};

/// Trait for SMS service integration
#[async_trait]
pub trait SmsServiceTrait: Send + Sync {
    /// Send a verification code via SMS, returns the provider message id
    async fn send_verification_code(&self, phone: &str, code: &str) -> DeliveryResult<String>;
    /// Check if the phone number format is valid
    fn is_valid_phone_number(&self, phone: &str) -> bool;
}

/// A phone verification flow, chosen once at startup
///
/// Callers only see session handles and verification outcomes; whether the
/// code lives in our store or at a third party is an implementation detail.
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Issue a code for `phone` and deliver it
    async fn send(&self, phone: &str) -> OtpResult<SessionHandle>;
    /// Check a submitted code against the session
    async fn verify(&self, session_id: &str, code: &str) -> OtpResult<VerifiedSession>;
    /// Short identifier used in logs and handles
    fn provider_name(&self) -> &str;
}
