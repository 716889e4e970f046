//! OTP provider and SMS delivery configuration module

use serde::{Deserialize, Serialize};

use super::env_or;

/// Which OTP provider owns issuing and checking codes (`OTP_PROVIDER`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Codes are generated, stored, rate limited and verified by this service
    Custom,
    /// Twilio Verify owns the whole code lifecycle
    TwilioVerify,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Custom
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "custom" | "internal" => Ok(ProviderKind::Custom),
            "twilio-verify" | "twilio_verify" | "verify" => Ok(ProviderKind::TwilioVerify),
            _ => Err(format!("Invalid OTP provider: {}", s)),
        }
    }
}

/// Delivery channel used by the custom provider (`SMS_PROVIDER`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsProviderKind {
    /// Log the message instead of sending it
    Mock,
    /// Twilio Messages API
    Twilio,
}

impl Default for SmsProviderKind {
    fn default() -> Self {
        SmsProviderKind::Mock
    }
}

impl std::str::FromStr for SmsProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(SmsProviderKind::Mock),
            "twilio" => Ok(SmsProviderKind::Twilio),
            _ => Err(format!("Invalid SMS provider: {}", s)),
        }
    }
}

/// Twilio account credentials shared by the SMS channel and Twilio Verify
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwilioCredentials {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// Sender number for plain SMS delivery (E.164)
    pub from_number: String,
    /// Verify service SID (only used by Twilio Verify)
    pub verify_service_sid: String,
    /// Maximum retry attempts for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry delay in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Timeout for API requests in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl TwilioCredentials {
    /// Create from environment variables; missing values are left empty
    pub fn from_env() -> Self {
        Self {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            from_number: std::env::var("TWILIO_FROM_NUMBER").unwrap_or_default(),
            verify_service_sid: std::env::var("TWILIO_VERIFY_SERVICE_SID").unwrap_or_default(),
            max_retries: env_or("TWILIO_MAX_RETRIES", default_max_retries()),
            retry_delay_ms: env_or("TWILIO_RETRY_DELAY_MS", default_retry_delay_ms()),
            request_timeout_secs: env_or("TWILIO_REQUEST_TIMEOUT_SECS", default_request_timeout()),
        }
    }

    /// Whether the account credentials are present
    pub fn has_account(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }
}

/// Provider selection, resolved once when the service is constructed
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// OTP provider
    #[serde(default)]
    pub kind: ProviderKind,
    /// SMS delivery channel for the custom provider
    #[serde(default)]
    pub sms_provider: SmsProviderKind,
    /// Twilio credentials
    #[serde(default)]
    pub twilio: TwilioCredentials,
}

impl ProviderConfig {
    /// Create from environment variables
    ///
    /// Unknown provider names fall back to the defaults (custom provider,
    /// mock SMS) rather than failing startup.
    pub fn from_env() -> Self {
        Self {
            kind: env_or("OTP_PROVIDER", ProviderKind::default()),
            sms_provider: env_or("SMS_PROVIDER", SmsProviderKind::default()),
            twilio: TwilioCredentials::from_env(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}
