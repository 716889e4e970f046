//! # OTP Core
//!
//! Core domain layer of the OTP service: the `OtpSession` entity, the
//! error taxonomy, the session store interface and the services that issue,
//! rate limit, verify and sweep one-time codes.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
