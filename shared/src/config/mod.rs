//! Configuration module with sub-modules per concern
//!
//! - `database` - MySQL connection and pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `otp` - Code lifetime, length, attempt budget and sweeper schedule
//! - `provider` - OTP provider selection and Twilio credentials
//! - `rate_limit` - Per-phone request limits

pub mod database;
pub mod environment;
pub mod otp;
pub mod provider;
pub mod rate_limit;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Re-export commonly used types
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, SweeperConfig};
pub use provider::{ProviderConfig, ProviderKind, SmsProviderKind, TwilioCredentials};
pub use rate_limit::RateLimitConfig;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Database configuration
    pub database: DatabaseConfig,

    /// OTP configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            otp: OtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            provider: ProviderConfig::default(),
            sweeper: SweeperConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/otp_gate_dev"),
            rate_limit: RateLimitConfig::development(),
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/otp_gate").with_max_connections(50),
            rate_limit: RateLimitConfig::production(),
            logging: LoggingConfig::for_environment(Environment::Production),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// Every OTP, rate limit, provider and database setting read from the
    /// environment overrides the environment preset.
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        let logging = LoggingConfig::for_environment(env);
        Self {
            environment: env,
            database: DatabaseConfig::from_env(),
            otp: OtpConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            provider: ProviderConfig::from_env(),
            sweeper: SweeperConfig::from_env(),
            logging,
        }
    }

    /// Check that every bounded setting is inside its supported range
    pub fn validate(&self) -> Result<(), String> {
        self.otp.validate()?;
        self.rate_limit.validate()
    }
}

/// Read and parse an environment variable, falling back to `default`
/// when it is unset or malformed.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u32 = env_or("OTP_SHARED_TEST_SURELY_UNSET_VARIABLE", 7);
        assert_eq!(value, 7);
    }

    #[test]
    fn test_from_env_clamps_oversized_durations() {
        std::env::set_var("OTP_EXPIRY_MINUTES", i64::MAX.to_string());
        std::env::set_var("RATE_LIMIT_WINDOW_MINUTES", "9223372036854775807");

        let config = AppConfig::from_env();

        std::env::remove_var("OTP_EXPIRY_MINUTES");
        std::env::remove_var("RATE_LIMIT_WINDOW_MINUTES");

        assert_eq!(config.otp.expiry_minutes, otp::MAX_EXPIRY_MINUTES);
        assert_eq!(config.rate_limit.window_minutes, rate_limit::MAX_WINDOW_MINUTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.rate_limit.window_minutes = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_preset() {
        let config = AppConfig::production();
        assert!(config.environment.is_production());
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_development_preset() {
        let config = AppConfig::development();
        assert!(config.environment.is_development());
        assert_eq!(config.rate_limit.max_requests_per_phone, 20);
    }
}
