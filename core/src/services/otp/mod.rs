//! OTP session services
//!
//! This module implements the phone verification flow:
//! - Code generation from the OS random source
//! - Per-phone sliding-window rate limiting with a cooldown
//! - Session creation that supersedes older codes for the same phone
//! - Single-use verification with an attempt budget
//! - Periodic sweeping of expired sessions
//! - The `OtpProvider` abstraction over custom and third-party flows

mod code_generator;
mod lifecycle;
mod provider;
mod rate_limiter;
mod sweeper;
mod traits;
mod types;
mod verification;

#[cfg(test)]
mod tests;

pub use code_generator::{generate_code, CodeGenerator};
pub use lifecycle::{SessionLifecycleManager, MAX_CREATE_RETRIES};
pub use provider::{CustomOtpProvider, CUSTOM_PROVIDER_NAME};
pub use rate_limiter::{evaluate, OtpRateLimiter};
pub use sweeper::{ExpirySweeper, SweepResult};
pub use traits::{OtpProvider, SmsServiceTrait};
pub use types::{IssuedSession, RateLimitDecision, SessionHandle, VerifiedSession};
pub use verification::VerificationEngine;
