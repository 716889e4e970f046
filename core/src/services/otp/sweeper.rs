//! Background removal of expired sessions
//!
//! Expiry is enforced lazily during verification; the sweeper only keeps the
//! store small. It also prunes request-log entries the rate limiter no longer
//! looks at.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use otp_shared::config::{OtpConfig, RateLimitConfig, SweeperConfig};

use crate::domain::entities::OtpSession;
use crate::errors::OtpResult;
use crate::repositories::OtpSessionRepository;

/// Periodic cleanup of expired sessions and stale request-log entries
pub struct ExpirySweeper<R: OtpSessionRepository + 'static> {
    repository: Arc<R>,
    expiry_minutes: i64,
    request_log_retention: Duration,
    config: SweeperConfig,
}

impl<R: OtpSessionRepository + 'static> ExpirySweeper<R> {
    pub fn new(
        repository: Arc<R>,
        otp: &OtpConfig,
        rate_limit: &RateLimitConfig,
        config: SweeperConfig,
    ) -> Self {
        let retention_seconds = rate_limit
            .window_seconds()
            .max(rate_limit.cooldown_seconds());

        Self {
            repository,
            expiry_minutes: otp.expiry_minutes,
            request_log_retention: Duration::seconds(retention_seconds),
            config,
        }
    }

    /// Delete every session older than `expiry_minutes`, for all phones
    pub async fn sweep(&self, expiry_minutes: i64) -> OtpResult<u64> {
        let cutoff = OtpSession::expiry_cutoff(Utc::now(), expiry_minutes);
        Ok(self.repository.delete_created_before(cutoff).await?)
    }

    /// Run one full cleanup pass
    ///
    /// Failures are collected in the result instead of aborting the pass.
    pub async fn run_once(&self) -> SweepResult {
        let mut result = SweepResult::default();

        match self.sweep(self.expiry_minutes).await {
            Ok(count) => result.expired_sessions_deleted = count,
            Err(e) => {
                error!(error = %e, event = "otp_sweep_failed", "Failed to sweep expired sessions");
                result.errors.push(format!("Session sweep error: {}", e));
            }
        }

        let cutoff = Utc::now() - self.request_log_retention;
        match self.repository.prune_request_log(cutoff).await {
            Ok(count) => result.request_log_pruned = count,
            Err(e) => {
                error!(error = %e, event = "otp_request_log_prune_failed", "Failed to prune request log");
                result.errors.push(format!("Request log prune error: {}", e));
            }
        }

        info!(
            expired_sessions_deleted = result.expired_sessions_deleted,
            request_log_pruned = result.request_log_pruned,
            event = "otp_sweep_completed",
            "OTP sweep completed"
        );

        result
    }

    /// Spawn a task that runs [`run_once`](Self::run_once) every
    /// `interval_seconds`; returns `None` when the sweeper is disabled
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("OTP sweeper is disabled");
            return None;
        }

        let period = std::time::Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "OTP sweeper started - will run every {} seconds",
                self.config.interval_seconds
            );

            let mut interval_timer = tokio::time::interval(period);

            loop {
                interval_timer.tick().await;

                let result = self.run_once().await;
                if !result.is_success() {
                    warn!("Sweep completed with errors: {:?}", result.errors);
                }
            }
        }))
    }
}

/// Result of a sweep pass
#[derive(Debug, Default)]
pub struct SweepResult {
    /// Number of expired sessions deleted
    pub expired_sessions_deleted: u64,
    /// Number of request-log entries removed
    pub request_log_pruned: u64,
    /// Any errors encountered during the pass
    pub errors: Vec<String>,
}

impl SweepResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_cleaned(&self) -> u64 {
        self.expired_sessions_deleted + self.request_log_pruned
    }
}
