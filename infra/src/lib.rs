//! # Infrastructure Layer
//!
//! Concrete implementations behind the OTP core traits.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL session store using SQLx, plus schema migrations
//! - **SMS**: Code delivery channels (mock, Twilio Messages)
//! - **Providers**: Twilio Verify as a third-party `OtpProvider` and the
//!   factory that picks the provider at startup
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)
//! - `twilio-sms`: Enable Twilio SMS delivery (default)

// Re-export core types for convenience
pub use otp_core::errors::*;

use otp_shared::config::AppConfig;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// SMS service module - code delivery channels
pub mod sms;

/// OTP providers and the provider factory
#[cfg(feature = "mysql")]
pub mod providers;

/// Load application configuration from the environment
///
/// Reads a `.env` file first if one is present.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    validate_config(&config)?;

    Ok(config)
}

/// Reject settings outside their supported ranges
pub fn validate_config(config: &AppConfig) -> Result<(), InfrastructureError> {
    config.validate().map_err(InfrastructureError::Config)
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins; otherwise the level from the environment's logging
/// config is used.
pub fn init_tracing(config: &AppConfig) {
    use otp_shared::config::LogFormat;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.logging.source_location)
        .with_line_number(config.logging.source_location);

    let result = match config.logging.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {}", e);
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMS service error, transient or after retries ran out
    #[error("SMS service error: {0}")]
    Sms(String),

    /// The SMS channel refuses the destination number
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// The SMS channel refused the message; resending will not help
    #[error("SMS rejected: {0}")]
    SmsRejected(String),
}
