//! Provider selection at startup

use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::info;

use otp_core::services::otp::{CustomOtpProvider, OtpProvider};
use otp_shared::config::{AppConfig, ProviderKind};

use crate::database::MySqlOtpSessionRepository;
use crate::sms::create_sms_service;
use crate::InfrastructureError;

use super::twilio_verify::TwilioVerifyProvider;

/// Build the provider selected by `OTP_PROVIDER`
///
/// The choice is made once; callers hold the returned trait object for the
/// lifetime of the process. A Twilio Verify selection without credentials is
/// a configuration error.
pub fn build_otp_provider(
    config: &AppConfig,
    pool: MySqlPool,
) -> Result<Arc<dyn OtpProvider>, InfrastructureError> {
    let provider: Arc<dyn OtpProvider> = match config.provider.kind {
        ProviderKind::Custom => Arc::new(build_custom_provider(config, pool)),
        ProviderKind::TwilioVerify => {
            Arc::new(TwilioVerifyProvider::new(config.provider.twilio.clone())?)
        }
    };

    info!(
        provider = provider.provider_name(),
        event = "otp_provider_selected",
        "OTP provider initialized"
    );

    Ok(provider)
}

/// Custom provider over the MySQL session store
pub fn build_custom_provider(
    config: &AppConfig,
    pool: MySqlPool,
) -> CustomOtpProvider<MySqlOtpSessionRepository> {
    let repository = Arc::new(MySqlOtpSessionRepository::new(pool));
    let sms_service = create_sms_service(&config.provider, config.otp.expiry_minutes);

    CustomOtpProvider::new(repository, sms_service, &config.otp, &config.rate_limit)
}
