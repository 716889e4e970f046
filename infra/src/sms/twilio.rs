//! Twilio SMS Service Implementation
//!
//! SMS delivery through the Twilio Messages API, with retries and exponential
//! backoff for throttling and server errors.

use async_trait::async_trait;
use phonenumber::{Mode, PhoneNumber};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use twilio::{Client, OutboundMessage};

use otp_shared::config::TwilioCredentials;
use otp_shared::utils::mask_phone_number;

use crate::{sms::sms_service::SmsService, InfrastructureError};

/// Twilio limit on a single message body
const MAX_MESSAGE_LENGTH: usize = 1600;

/// Twilio SMS service implementation
pub struct TwilioSmsService {
    client: Client,
    config: TwilioCredentials,
}

impl TwilioSmsService {
    /// Create a new Twilio SMS service
    ///
    /// Fails when the account credentials are missing or the sender number is
    /// not in E.164 format.
    pub fn new(config: TwilioCredentials) -> Result<Self, InfrastructureError> {
        if !config.has_account() {
            return Err(InfrastructureError::Config(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set".to_string(),
            ));
        }
        if !config.from_number.starts_with('+') {
            return Err(InfrastructureError::Config(
                "TWILIO_FROM_NUMBER must be in E.164 format (starting with '+')".to_string(),
            ));
        }

        let client = Client::new(&config.account_sid, &config.auth_token);

        info!(
            "Twilio SMS service initialized with from number: {}",
            mask_phone_number(&config.from_number)
        );

        Ok(Self { client, config })
    }

    /// Validate a phone number and format it as E.164
    pub(crate) fn validate_phone_number(phone: &str) -> Result<String, InfrastructureError> {
        if !phone.starts_with('+') {
            return Err(InfrastructureError::InvalidPhoneNumber(
                "Phone number must be in E.164 format (e.g., +14155552671)".to_string(),
            ));
        }

        match phone.parse::<PhoneNumber>() {
            Ok(parsed) => {
                let formatted = parsed.format().mode(Mode::E164).to_string();
                debug!("Validated phone number: {}", mask_phone_number(&formatted));
                Ok(formatted)
            }
            Err(e) => {
                error!("Invalid phone number format: {}", e);
                Err(InfrastructureError::InvalidPhoneNumber(format!(
                    "Invalid phone number format: {}",
                    e
                )))
            }
        }
    }

    /// Send SMS with retry logic
    async fn send_with_retry(&self, to: &str, message: &str) -> Result<String, InfrastructureError> {
        let max_retries = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            attempts += 1;

            debug!(
                "Sending SMS attempt {}/{} to {}",
                attempts,
                max_retries,
                mask_phone_number(to)
            );

            let msg = OutboundMessage::new(&self.config.from_number, to, message);

            match self.client.send_message(msg).await {
                Ok(response) => {
                    info!(
                        "SMS sent successfully to {} with SID: {}",
                        mask_phone_number(to),
                        response.sid
                    );
                    return Ok(response.sid);
                }
                Err(e) => {
                    error!(
                        "Failed to send SMS (attempt {}/{}): {}",
                        attempts, max_retries, e
                    );

                    if attempts >= max_retries {
                        return Err(InfrastructureError::Sms(format!(
                            "Failed to send SMS after {} attempts: {}",
                            max_retries, e
                        )));
                    }

                    match classify_failure(&e.to_string()) {
                        FailureKind::Throttled => {
                            warn!("Rate limit detected, backing off for {:?}", delay)
                        }
                        FailureKind::Server => {
                            warn!("Server error detected, retrying after {:?}", delay)
                        }
                        FailureKind::Client => {
                            return Err(InfrastructureError::SmsRejected(format!(
                                "Invalid request: {}",
                                e
                            )));
                        }
                    }

                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FailureKind {
    Throttled,
    Server,
    Client,
}

/// Decide from the error text whether a failed send is worth retrying
fn classify_failure(error_msg: &str) -> FailureKind {
    let lower = error_msg.to_lowercase();
    if lower.contains("429") || lower.contains("rate") {
        FailureKind::Throttled
    } else if lower.contains("400") || lower.contains("invalid") {
        FailureKind::Client
    } else {
        FailureKind::Server
    }
}

#[async_trait]
impl SmsService for TwilioSmsService {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, InfrastructureError> {
        let normalized_phone = Self::validate_phone_number(phone_number)?;

        if message.len() > MAX_MESSAGE_LENGTH {
            return Err(InfrastructureError::SmsRejected(format!(
                "Message exceeds maximum length of {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        info!(
            "Sending SMS to {} via Twilio (message length: {} chars)",
            mask_phone_number(&normalized_phone),
            message.len()
        );

        self.send_with_retry(&normalized_phone, message).await
    }

    fn provider_name(&self) -> &str {
        "Twilio"
    }
}
