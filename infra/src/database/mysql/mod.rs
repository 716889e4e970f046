//! MySQL repository implementations

pub mod otp_session_repository_impl;

pub use otp_session_repository_impl::MySqlOtpSessionRepository;
