//! Business services containing domain logic and use cases.

pub mod otp;

// Re-export commonly used types
pub use otp::{
    generate_code, CodeGenerator, CustomOtpProvider, ExpirySweeper, IssuedSession, OtpProvider,
    OtpRateLimiter, RateLimitDecision, SessionHandle, SessionLifecycleManager, SmsServiceTrait,
    SweepResult, VerificationEngine, VerifiedSession,
};
