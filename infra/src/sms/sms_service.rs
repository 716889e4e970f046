//! SMS Service Interface
//!
//! Defines the trait for SMS channels that deliver verification codes.

use async_trait::async_trait;

use otp_core::errors::DeliveryError;

use crate::InfrastructureError;

/// SMS service trait for sending text messages
///
/// Implementations include:
/// - Twilio Messages API
/// - Mock implementation for development
#[async_trait]
pub trait SmsService: Send + Sync {
    /// Send an SMS message to a phone number
    ///
    /// # Returns
    ///
    /// * `Ok(message_id)` - Unique identifier for the sent message
    /// * `Err(InfrastructureError)` - If sending fails
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, InfrastructureError>;

    /// Get the service provider name
    fn provider_name(&self) -> &str;
}

impl From<InfrastructureError> for DeliveryError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::InvalidPhoneNumber(msg) => DeliveryError::InvalidRecipient(msg),
            InfrastructureError::SmsRejected(msg) => DeliveryError::Rejected(msg),
            other => DeliveryError::Unavailable(other.to_string()),
        }
    }
}

/// Text of the SMS carrying a verification code
pub fn verification_message(code: &str, expiry_minutes: i64) -> String {
    format!(
        "Your verification code is: {}. This code will expire in {} minutes.",
        code, expiry_minutes
    )
}

/// Validate phone number format (E.164)
pub fn is_valid_phone_number(phone: &str) -> bool {
    otp_shared::utils::is_canonical_phone(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_keeps_kind() {
        assert_eq!(
            DeliveryError::from(InfrastructureError::InvalidPhoneNumber("+1".to_string())),
            DeliveryError::InvalidRecipient("+1".to_string())
        );
        assert_eq!(
            DeliveryError::from(InfrastructureError::SmsRejected("too long".to_string())),
            DeliveryError::Rejected("too long".to_string())
        );
        assert_eq!(
            DeliveryError::from(InfrastructureError::Sms("timeout".to_string())),
            DeliveryError::Unavailable("SMS service error: timeout".to_string())
        );
    }

    #[test]
    fn test_verification_message() {
        let message = verification_message("012345", 5);
        assert!(message.contains("012345"));
        assert!(message.contains("5 minutes"));
    }

    #[test]
    fn test_is_valid_phone_number() {
        assert!(is_valid_phone_number("+1234567890"));
        assert!(is_valid_phone_number("+123456789012345"));

        assert!(!is_valid_phone_number("1234567890")); // No plus
        assert!(!is_valid_phone_number("+123")); // Too short
        assert!(!is_valid_phone_number("+1234567890123456")); // Too long
        assert!(!is_valid_phone_number("+123abc4567"));
    }
}
