//! Domain entities representing core business objects.

pub mod otp_session;

pub use otp_session::OtpSession;
