//! Rate limiting configuration module

use serde::{Deserialize, Serialize};

use super::env_or;

/// Longest sliding window accepted from configuration (one week)
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Longest cooldown accepted from configuration (one day)
pub const MAX_COOLDOWN_SECONDS: i64 = 24 * 60 * 60;

/// Per-phone OTP request limits
///
/// A phone may request at most `max_requests_per_phone` codes within any
/// trailing `window_minutes`, and consecutive requests must be at least
/// `min_seconds_between_requests` apart.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Max OTP requests per phone inside the window (`MAX_REQUESTS_PER_PHONE`)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_phone: u32,

    /// Sliding window length in minutes (`RATE_LIMIT_WINDOW_MINUTES`)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,

    /// Cooldown between two requests in seconds (`MIN_TIME_BETWEEN_REQUESTS_SECONDS`)
    #[serde(default = "default_cooldown_seconds")]
    pub min_seconds_between_requests: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests_per_phone: default_max_requests(),
            window_minutes: default_window_minutes(),
            min_seconds_between_requests: default_cooldown_seconds(),
        }
    }
}

impl RateLimitConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env_or("RATE_LIMIT_ENABLED", default_enabled()),
            max_requests_per_phone: env_or("MAX_REQUESTS_PER_PHONE", default_max_requests()),
            window_minutes: env_or("RATE_LIMIT_WINDOW_MINUTES", default_window_minutes())
                .clamp(1, MAX_WINDOW_MINUTES),
            min_seconds_between_requests: env_or(
                "MIN_TIME_BETWEEN_REQUESTS_SECONDS",
                default_cooldown_seconds(),
            )
            .clamp(0, MAX_COOLDOWN_SECONDS),
        }
    }

    /// Window length in seconds, clamped to the supported range
    pub fn window_seconds(&self) -> i64 {
        self.window_minutes.clamp(1, MAX_WINDOW_MINUTES) * 60
    }

    /// Cooldown in seconds, clamped to the supported range
    pub fn cooldown_seconds(&self) -> i64 {
        self.min_seconds_between_requests.clamp(0, MAX_COOLDOWN_SECONDS)
    }

    /// Whether every value is inside its supported range
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.window_minutes) {
            return Err(format!(
                "RATE_LIMIT_WINDOW_MINUTES must be between 1 and {}",
                MAX_WINDOW_MINUTES
            ));
        }
        if !(0..=MAX_COOLDOWN_SECONDS).contains(&self.min_seconds_between_requests) {
            return Err(format!(
                "MIN_TIME_BETWEEN_REQUESTS_SECONDS must be between 0 and {}",
                MAX_COOLDOWN_SECONDS
            ));
        }
        Ok(())
    }

    /// Create a development configuration (more lenient limits)
    pub fn development() -> Self {
        Self {
            max_requests_per_phone: 20,
            min_seconds_between_requests: 5,
            ..Default::default()
        }
    }

    /// Create a production configuration
    pub fn production() -> Self {
        Self::default()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_minutes() -> i64 {
    15
}

fn default_cooldown_seconds() -> i64 {
    30
}
