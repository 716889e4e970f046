//! Removes expired OTP sessions and stale request-log entries.
//!
//! Runs a single pass by default, suitable for cron. With `--watch` it keeps
//! running and sweeps every `SWEEP_INTERVAL_SECONDS`.

use anyhow::{Context, Result};
use std::sync::Arc;

use otp_core::services::otp::ExpirySweeper;
use otp_infra::database::{DatabasePool, MySqlOtpSessionRepository};

#[tokio::main]
async fn main() -> Result<()> {
    let config = otp_infra::load_config().context("failed to load configuration")?;
    otp_infra::init_tracing(&config);

    let watch = std::env::args().skip(1).any(|arg| arg == "--watch");

    let pool = DatabasePool::new(config.database.clone())
        .await
        .context("failed to connect to the session store")?;
    pool.run_migrations()
        .await
        .context("failed to apply migrations")?;

    let repository = Arc::new(MySqlOtpSessionRepository::new(pool.get_pool().clone()));
    let sweeper = Arc::new(ExpirySweeper::new(
        repository,
        &config.otp,
        &config.rate_limit,
        config.sweeper.clone(),
    ));

    if watch {
        let handle = sweeper
            .start_background_task()
            .context("sweeper is disabled (SWEEP_ENABLED=false)")?;

        tokio::select! {
            result = handle => result.context("sweeper task stopped unexpectedly")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                tracing::info!("Shutdown signal received");
            }
        }
    } else {
        let result = sweeper.run_once().await;
        if !result.is_success() {
            pool.close().await;
            anyhow::bail!("sweep finished with errors: {}", result.errors.join("; "));
        }
        tracing::info!("Removed {} rows", result.total_cleaned());
    }

    pool.close().await;
    Ok(())
}
