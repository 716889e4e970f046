//! SMS Service Module
//!
//! Delivery channels for codes issued by the custom OTP provider.
//!
//! ## Features
//!
//! - **SMS Service Trait**: Common interface for all SMS channels
//! - **Mock Implementation**: Logs a masked message for development
//! - **Twilio Support**: Production SMS via the Twilio Messages API
//! - **Security**: Phone numbers are masked and codes are never logged

pub mod mock_sms;
pub mod sms_service;

// Twilio SMS service (feature-gated)
#[cfg(feature = "twilio-sms")]
pub mod twilio;
#[cfg(feature = "twilio-sms")]
pub mod twilio_trait_adapter;

use std::sync::Arc;

use otp_core::services::otp::SmsServiceTrait;
use otp_shared::config::{ProviderConfig, SmsProviderKind};

// Re-export commonly used types
pub use mock_sms::MockSmsService;
pub use sms_service::{is_valid_phone_number, verification_message, SmsService};

#[cfg(feature = "twilio-sms")]
pub use twilio::TwilioSmsService;
#[cfg(feature = "twilio-sms")]
pub use twilio_trait_adapter::TwilioSmsServiceAdapter;

#[cfg(test)]
mod tests;

/// Create the code delivery channel selected by `SMS_PROVIDER`
///
/// Falls back to the mock channel when the Twilio channel cannot be built.
pub fn create_sms_service(config: &ProviderConfig, expiry_minutes: i64) -> Arc<dyn SmsServiceTrait> {
    match config.sms_provider {
        SmsProviderKind::Mock => Arc::new(MockSmsService::new().with_expiry_minutes(expiry_minutes)),
        #[cfg(feature = "twilio-sms")]
        SmsProviderKind::Twilio => {
            match TwilioSmsServiceAdapter::new(config.twilio.clone(), expiry_minutes) {
                Ok(service) => Arc::new(service),
                Err(e) => {
                    tracing::error!("Failed to initialize Twilio SMS service: {}", e);
                    tracing::warn!("Falling back to mock SMS service");
                    Arc::new(MockSmsService::new().with_expiry_minutes(expiry_minutes))
                }
            }
        }
        #[cfg(not(feature = "twilio-sms"))]
        SmsProviderKind::Twilio => {
            tracing::warn!("Twilio SMS requires the twilio-sms feature, using mock implementation");
            Arc::new(MockSmsService::new().with_expiry_minutes(expiry_minutes))
        }
    }
}
