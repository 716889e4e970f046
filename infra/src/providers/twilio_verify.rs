//! Twilio Verify as an OTP provider
//!
//! Twilio generates, stores, delivers and checks the code. Our rate limiter
//! and session store are not involved; the Twilio verification SID is the
//! session handle.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use otp_core::errors::{OtpError, OtpResult, RateLimitReason};
use otp_core::services::otp::{OtpProvider, SessionHandle, VerifiedSession};
use otp_shared::config::TwilioCredentials;
use otp_shared::utils::{is_canonical_phone, mask_phone_number, normalize_phone_number};

use crate::InfrastructureError;

pub const TWILIO_VERIFY_PROVIDER_NAME: &str = "twilio-verify";

const DEFAULT_BASE_URL: &str = "https://verify.twilio.com";

/// Wait reported when Twilio throttles without a Retry-After header
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Verification resource returned by both Verify endpoints
#[derive(Debug, Deserialize)]
struct VerificationResource {
    sid: String,
    to: String,
    status: String,
}

/// Outcome of a verification check, by Twilio status
#[derive(Debug, PartialEq, Eq)]
enum CheckStatus {
    Approved,
    Pending,
    Gone,
    Unknown,
}

impl CheckStatus {
    fn parse(status: &str) -> Self {
        match status {
            "approved" => CheckStatus::Approved,
            "pending" => CheckStatus::Pending,
            "canceled" | "expired" | "max_attempts_reached" => CheckStatus::Gone,
            _ => CheckStatus::Unknown,
        }
    }
}

/// Third-party provider backed by the Twilio Verify v2 API
pub struct TwilioVerifyProvider {
    client: Client,
    credentials: TwilioCredentials,
    base_url: String,
}

impl TwilioVerifyProvider {
    pub fn new(credentials: TwilioCredentials) -> Result<Self, InfrastructureError> {
        if !credentials.has_account() {
            return Err(InfrastructureError::Config(
                "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set".to_string(),
            ));
        }
        if credentials.verify_service_sid.is_empty() {
            return Err(InfrastructureError::Config(
                "TWILIO_VERIFY_SERVICE_SID must be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(credentials.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "{}/v2/Services/{}/{}",
            self.base_url, self.credentials.verify_service_sid, resource
        )
    }

    async fn post_form(&self, resource: &str, form: &[(&str, &str)]) -> OtpResult<Response> {
        self.client
            .post(self.service_url(resource))
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, event = "twilio_verify_unreachable", "Twilio Verify request failed");
                OtpError::ProviderUnavailable {
                    message: e.to_string(),
                }
            })
    }

    async fn parse_resource(response: Response) -> OtpResult<VerificationResource> {
        response
            .json::<VerificationResource>()
            .await
            .map_err(|e| OtpError::ProviderUnavailable {
                message: format!("Unexpected Twilio Verify response: {}", e),
            })
    }
}

/// Map a non-success HTTP status to an error
///
/// `on_not_found` is what a 404 means for the endpoint that returned it.
fn error_for_status(status: StatusCode, retry_after: Option<u64>, on_not_found: OtpError) -> OtpError {
    match status {
        StatusCode::NOT_FOUND => on_not_found,
        StatusCode::TOO_MANY_REQUESTS => OtpError::RateLimited {
            retry_after_seconds: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECONDS).max(1),
            reason: RateLimitReason::ProviderThrottled,
        },
        other => OtpError::ProviderUnavailable {
            message: format!("Twilio Verify returned HTTP {}", other.as_u16()),
        },
    }
}

fn retry_after_seconds(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl OtpProvider for TwilioVerifyProvider {
    async fn send(&self, phone: &str) -> OtpResult<SessionHandle> {
        let canonical = normalize_phone_number(phone);
        if !is_canonical_phone(&canonical) {
            return Err(OtpError::InvalidPhone {
                phone: phone.to_string(),
            });
        }

        let response = self
            .post_form("Verifications", &[("To", canonical.as_str()), ("Channel", "sms")])
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = if status == StatusCode::BAD_REQUEST {
                OtpError::InvalidPhone {
                    phone: phone.to_string(),
                }
            } else {
                let unavailable = OtpError::ProviderUnavailable {
                    message: "Twilio Verify service not found".to_string(),
                };
                error_for_status(status, retry_after_seconds(&response), unavailable)
            };
            warn!(
                phone = %mask_phone_number(&canonical),
                status = status.as_u16(),
                event = "twilio_verify_send_failed",
                "Twilio Verify rejected the verification request"
            );
            return Err(error);
        }

        let resource = Self::parse_resource(response).await?;

        info!(
            phone = %mask_phone_number(&canonical),
            session_id = %resource.sid,
            event = "otp_sent",
            provider = TWILIO_VERIFY_PROVIDER_NAME,
            "OTP sent"
        );

        Ok(SessionHandle {
            session_id: resource.sid.clone(),
            phone: canonical,
            provider: TWILIO_VERIFY_PROVIDER_NAME.to_string(),
            expires_at: None,
            message_id: Some(resource.sid),
        })
    }

    async fn verify(&self, session_id: &str, code: &str) -> OtpResult<VerifiedSession> {
        let response = self
            .post_form(
                "VerificationCheck",
                &[("VerificationSid", session_id), ("Code", code)],
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(
                status,
                retry_after_seconds(&response),
                OtpError::SessionNotFound,
            ));
        }

        let resource = Self::parse_resource(response).await?;

        match CheckStatus::parse(&resource.status) {
            CheckStatus::Approved => {
                info!(
                    phone = %mask_phone_number(&resource.to),
                    session_id = %session_id,
                    event = "otp_verified",
                    provider = TWILIO_VERIFY_PROVIDER_NAME,
                    "OTP verified"
                );
                Ok(VerifiedSession {
                    session_id: session_id.to_string(),
                    phone: resource.to,
                    verified_at: Utc::now(),
                })
            }
            CheckStatus::Pending => Err(OtpError::OtpMismatch {
                remaining_attempts: None,
            }),
            CheckStatus::Gone => Err(OtpError::SessionExpired),
            CheckStatus::Unknown => Err(OtpError::ProviderUnavailable {
                message: format!("Unknown verification status: {}", resource.status),
            }),
        }
    }

    fn provider_name(&self) -> &str {
        TWILIO_VERIFY_PROVIDER_NAME
    }
}
