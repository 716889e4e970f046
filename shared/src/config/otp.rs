//! OTP session configuration module

use serde::{Deserialize, Serialize};

use super::env_or;

/// Shortest code length accepted from configuration
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code length accepted from configuration
pub const MAX_CODE_LENGTH: usize = 9;

/// Longest code lifetime accepted from configuration (one day)
pub const MAX_EXPIRY_MINUTES: i64 = 24 * 60;

/// OTP issuing and verification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Code lifetime in minutes (`OTP_EXPIRY_MINUTES`)
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,

    /// Number of digits in a code (`OTP_CODE_LENGTH`)
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Wrong codes accepted before a session is burned; 0 disables the cap
    /// (`OTP_MAX_VERIFY_ATTEMPTS`)
    #[serde(default = "default_max_verify_attempts")]
    pub max_verify_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_expiry_minutes(),
            code_length: default_code_length(),
            max_verify_attempts: default_max_verify_attempts(),
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            expiry_minutes: env_or("OTP_EXPIRY_MINUTES", default_expiry_minutes())
                .clamp(1, MAX_EXPIRY_MINUTES),
            code_length: env_or("OTP_CODE_LENGTH", default_code_length())
                .clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH),
            max_verify_attempts: env_or("OTP_MAX_VERIFY_ATTEMPTS", default_max_verify_attempts()),
        }
    }

    /// Set the code lifetime, clamped to `1..=MAX_EXPIRY_MINUTES`
    pub fn with_expiry_minutes(mut self, minutes: i64) -> Self {
        self.expiry_minutes = minutes.clamp(1, MAX_EXPIRY_MINUTES);
        self
    }

    /// Whether every value is inside its supported range
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_EXPIRY_MINUTES).contains(&self.expiry_minutes) {
            return Err(format!(
                "OTP_EXPIRY_MINUTES must be between 1 and {}",
                MAX_EXPIRY_MINUTES
            ));
        }
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(format!(
                "OTP_CODE_LENGTH must be between {} and {}",
                MIN_CODE_LENGTH, MAX_CODE_LENGTH
            ));
        }
        Ok(())
    }

    /// Set the wrong-code budget (0 = unlimited)
    pub fn with_max_verify_attempts(mut self, attempts: u32) -> Self {
        self.max_verify_attempts = attempts;
        self
    }

    /// Whether wrong-code submissions are capped
    pub fn limits_attempts(&self) -> bool {
        self.max_verify_attempts > 0
    }
}

/// Expiry sweeper scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweeperConfig {
    /// How often the background sweep runs (`SWEEP_INTERVAL_SECONDS`)
    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u64,

    /// Whether the background sweep is started at all (`SWEEP_ENABLED`)
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval(),
            enabled: default_sweep_enabled(),
        }
    }
}

impl SweeperConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            interval_seconds: env_or("SWEEP_INTERVAL_SECONDS", default_sweep_interval()).max(1),
            enabled: env_or("SWEEP_ENABLED", default_sweep_enabled()),
        }
    }
}

fn default_expiry_minutes() -> i64 {
    5
}

fn default_code_length() -> usize {
    6
}

fn default_max_verify_attempts() -> u32 {
    5
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_sweep_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_defaults() {
        let config = OtpConfig::default();
        assert_eq!(config.expiry_minutes, 5);
        assert_eq!(config.code_length, 6);
        assert!(config.limits_attempts());
    }

    #[test]
    fn test_unlimited_attempts() {
        let config = OtpConfig::default().with_max_verify_attempts(0);
        assert!(!config.limits_attempts());
    }

    #[test]
    fn test_expiry_is_clamped() {
        assert_eq!(
            OtpConfig::default().with_expiry_minutes(i64::MAX / 2).expiry_minutes,
            MAX_EXPIRY_MINUTES
        );
        assert_eq!(OtpConfig::default().with_expiry_minutes(-3).expiry_minutes, 1);
    }

    #[test]
    fn test_validate_rejects_oversized_expiry() {
        let mut config = OtpConfig::default();
        assert!(config.validate().is_ok());

        config.expiry_minutes = MAX_EXPIRY_MINUTES + 1;
        assert!(config.validate().is_err());

        config.expiry_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: OtpConfig = serde_json::from_str(r#"{"expiry_minutes": 1}"#).unwrap();
        assert_eq!(config.expiry_minutes, 1);
        assert_eq!(config.code_length, 6);
        assert_eq!(config.max_verify_attempts, 5);
    }
}
