//! Per-phone request limiting for code issuance
//!
//! Two rules apply, in order: a sliding window capping how many codes a phone
//! may request, and a minimum gap between consecutive requests. The history
//! comes from the store so every server instance sees the same counts.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use otp_shared::config::RateLimitConfig;
use otp_shared::utils::mask_phone_number;

use crate::errors::RateLimitReason;
use crate::repositories::OtpSessionRepository;

use super::types::RateLimitDecision;

/// Store-backed rate limiter for OTP requests
pub struct OtpRateLimiter<R: OtpSessionRepository + 'static> {
    repository: Arc<R>,
    config: RateLimitConfig,
}

impl<R: OtpSessionRepository + 'static> OtpRateLimiter<R> {
    pub fn new(repository: Arc<R>, config: RateLimitConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decide whether `phone` may request a new code now
    ///
    /// Read-only. If the store cannot be reached the request is allowed.
    pub async fn check(&self, phone: &str) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::allow();
        }

        let now = Utc::now();
        let since = now - Duration::seconds(self.config.window_seconds());

        let history = match self.repository.request_times_since(phone, since).await {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    phone = %mask_phone_number(phone),
                    error = %e,
                    event = "rate_limit_check_failed",
                    "Rate limit store unavailable, allowing request"
                );
                return RateLimitDecision::allow();
            }
        };

        let decision = evaluate(&history, now, &self.config);
        if !decision.allowed {
            info!(
                phone = %mask_phone_number(phone),
                reason = ?decision.reason,
                retry_after_seconds = ?decision.retry_after_seconds,
                requests_in_window = history.len(),
                event = "rate_limit_exceeded",
                "OTP request rate limited"
            );
        }
        decision
    }
}

/// Apply the window and cooldown rules to a request history
///
/// `history` holds request times for one phone; entries older than the window
/// are ignored. A zero `max_requests_per_phone` disables the window rule.
pub fn evaluate(
    history: &[DateTime<Utc>],
    now: DateTime<Utc>,
    config: &RateLimitConfig,
) -> RateLimitDecision {
    let window = Duration::seconds(config.window_seconds());
    let window_start = now - window;

    let in_window: Vec<DateTime<Utc>> = history
        .iter()
        .copied()
        .filter(|at| *at >= window_start)
        .collect();

    let max_requests = config.max_requests_per_phone as usize;
    if max_requests > 0 && in_window.len() >= max_requests {
        if let Some(oldest) = in_window.iter().min() {
            return RateLimitDecision::deny(
                RateLimitReason::TooManyRequests,
                seconds_until(*oldest + window, now),
            );
        }
    }

    if let Some(latest) = in_window.iter().max() {
        let cooldown = Duration::seconds(config.cooldown_seconds());
        if now - *latest < cooldown {
            return RateLimitDecision::deny(
                RateLimitReason::Cooldown,
                seconds_until(*latest + cooldown, now),
            );
        }
    }

    RateLimitDecision::allow()
}

/// Whole seconds from `now` until `target`, rounded up, at least 1
fn seconds_until(target: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (target - now).num_milliseconds().max(0) as u64;
    ((millis + 999) / 1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests_per_phone: 5,
            window_minutes: 15,
            min_seconds_between_requests: 30,
        }
    }

    #[test]
    fn test_empty_history_allows() {
        assert!(evaluate(&[], Utc::now(), &config()).allowed);
    }

    #[test]
    fn test_window_full_reports_time_until_oldest_leaves() {
        let now = Utc::now();
        let history: Vec<_> = (0..5).map(|i| now - Duration::minutes(10 - i)).collect();

        let decision = evaluate(&history, now, &config());

        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(RateLimitReason::TooManyRequests));
        // Oldest request is 10 minutes old, window is 15
        assert_eq!(decision.retry_after_seconds, Some(300));
    }

    #[test]
    fn test_cooldown_reports_remaining_seconds() {
        let now = Utc::now();
        let decision = evaluate(&[now - Duration::seconds(5)], now, &config());

        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(RateLimitReason::Cooldown));
        assert_eq!(decision.retry_after_seconds, Some(25));
    }

    #[test]
    fn test_cooldown_elapsed_allows() {
        let now = Utc::now();
        assert!(evaluate(&[now - Duration::seconds(30)], now, &config()).allowed);
    }

    #[test]
    fn test_entries_outside_window_ignored() {
        let now = Utc::now();
        let history: Vec<_> = (0..10).map(|i| now - Duration::minutes(16 + i)).collect();
        assert!(evaluate(&history, now, &config()).allowed);
    }

    #[test]
    fn test_retry_after_is_at_least_one() {
        let now = Utc::now();
        let decision = evaluate(&[now - Duration::milliseconds(29_999)], now, &config());
        assert_eq!(decision.retry_after_seconds, Some(1));
    }

    #[test]
    fn test_zero_max_requests_only_applies_cooldown() {
        let mut config = config();
        config.max_requests_per_phone = 0;
        let now = Utc::now();
        let history: Vec<_> = (0..50).map(|i| now - Duration::seconds(60 + i)).collect();

        assert!(evaluate(&history, now, &config).allowed);
    }
}
