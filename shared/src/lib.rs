//! Shared utilities and common types for the OTP service
//!
//! This crate provides common functionality used across all workspace members:
//! - Configuration types loaded from the environment
//! - Error response structures and error codes
//! - Phone number utilities
//! - Language selection for user-facing messages

pub mod config;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, DatabaseConfig, Environment, LoggingConfig, OtpConfig, ProviderConfig,
    ProviderKind, RateLimitConfig, SmsProviderKind, SweeperConfig, TwilioCredentials,
};
pub use errors::{error_codes, ErrorResponse, IntoErrorResponse};
pub use types::Language;
pub use utils::phone;
