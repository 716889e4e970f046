//! User-facing messages and error responses for [`OtpError`].

use otp_shared::{error_codes, ErrorResponse, IntoErrorResponse, Language};

use super::{OtpError, RateLimitReason};

impl OtpError {
    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            OtpError::RateLimited { .. } => error_codes::RATE_LIMIT_EXCEEDED,
            OtpError::SessionNotFound => error_codes::SESSION_NOT_FOUND,
            OtpError::SessionExpired => error_codes::VERIFICATION_CODE_EXPIRED,
            OtpError::OtpMismatch { .. } => error_codes::VERIFICATION_CODE_INVALID,
            OtpError::TooManyAttempts => error_codes::MAX_ATTEMPTS_EXCEEDED,
            OtpError::InvalidPhone { .. } => error_codes::PHONE_INVALID,
            OtpError::DeliveryFailed { .. } => error_codes::SMS_ERROR,
            OtpError::ProviderUnavailable { .. } => error_codes::PROVIDER_UNAVAILABLE,
            OtpError::StorageUnavailable { .. } => error_codes::STORAGE_UNAVAILABLE,
        }
    }

    /// Actionable message for the end user
    ///
    /// Internal details (storage or provider errors) are never included.
    pub fn user_message(&self, lang: Language) -> String {
        match (self, lang) {
            (OtpError::RateLimited { retry_after_seconds, reason }, Language::English) => {
                match reason {
                    RateLimitReason::Cooldown => format!(
                        "Please wait {} seconds before requesting a new code",
                        retry_after_seconds
                    ),
                    _ => format!(
                        "Too many code requests. Please try again in {} seconds",
                        retry_after_seconds
                    ),
                }
            }
            (OtpError::RateLimited { retry_after_seconds, reason }, Language::Chinese) => {
                match reason {
                    RateLimitReason::Cooldown => {
                        format!("请等待 {} 秒后再请求新的验证码", retry_after_seconds)
                    }
                    _ => format!("验证码请求过于频繁，请在 {} 秒后重试", retry_after_seconds),
                }
            }
            (OtpError::SessionNotFound, Language::English) => {
                "No pending verification code. Please request a new code".to_string()
            }
            (OtpError::SessionNotFound, Language::Chinese) => {
                "没有待验证的验证码，请重新获取".to_string()
            }
            (OtpError::SessionExpired, Language::English) => {
                "Verification code expired. Please request a new code".to_string()
            }
            (OtpError::SessionExpired, Language::Chinese) => {
                "验证码已过期，请重新获取".to_string()
            }
            (OtpError::OtpMismatch { remaining_attempts }, Language::English) => {
                match remaining_attempts {
                    Some(n) => format!("Incorrect verification code. {} attempt(s) remaining", n),
                    None => "Incorrect verification code. Please try again".to_string(),
                }
            }
            (OtpError::OtpMismatch { remaining_attempts }, Language::Chinese) => {
                match remaining_attempts {
                    Some(n) => format!("验证码错误，还剩 {} 次机会", n),
                    None => "验证码错误，请重试".to_string(),
                }
            }
            (OtpError::TooManyAttempts, Language::English) => {
                "Too many incorrect attempts. Please request a new code".to_string()
            }
            (OtpError::TooManyAttempts, Language::Chinese) => {
                "尝试次数超限，请重新获取验证码".to_string()
            }
            (OtpError::InvalidPhone { .. }, Language::English) => {
                "Invalid phone number. Use the international format, e.g. +14155552671".to_string()
            }
            (OtpError::InvalidPhone { .. }, Language::Chinese) => {
                "无效的手机号码格式，请使用国际格式".to_string()
            }
            (OtpError::DeliveryFailed { .. }, Language::English) => {
                "Could not send the verification code. Please try again later".to_string()
            }
            (OtpError::DeliveryFailed { .. }, Language::Chinese) => {
                "验证码发送失败，请稍后重试".to_string()
            }
            (OtpError::ProviderUnavailable { .. }, Language::English)
            | (OtpError::StorageUnavailable { .. }, Language::English) => {
                "Verification is temporarily unavailable. Please try again later".to_string()
            }
            (OtpError::ProviderUnavailable { .. }, Language::Chinese)
            | (OtpError::StorageUnavailable { .. }, Language::Chinese) => {
                "验证服务暂时不可用，请稍后重试".to_string()
            }
        }
    }

    /// Build an error response in the requested language
    pub fn to_localized_response(&self, lang: Language) -> ErrorResponse {
        let response = ErrorResponse::new(self.error_code(), self.user_message(lang));
        match self {
            OtpError::RateLimited { retry_after_seconds, reason } => response
                .add_detail("retry_after_seconds", retry_after_seconds)
                .add_detail("reason", reason),
            OtpError::OtpMismatch { remaining_attempts: Some(n) } => {
                response.add_detail("remaining_attempts", n)
            }
            _ => response,
        }
    }
}

impl IntoErrorResponse for OtpError {
    fn to_error_response(&self) -> ErrorResponse {
        self.to_localized_response(Language::default())
    }
}
