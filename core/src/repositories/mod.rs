//! Repository traits and implementations for persistence.

pub mod otp_session;

pub use otp_session::{MockOtpSessionRepository, OtpSessionRepository};
