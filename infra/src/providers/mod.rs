//! OTP provider implementations and selection

pub mod factory;
pub mod twilio_verify;

pub use factory::{build_custom_provider, build_otp_provider};
pub use twilio_verify::{TwilioVerifyProvider, TWILIO_VERIFY_PROVIDER_NAME};
