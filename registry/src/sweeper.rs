use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use kernel::repository::booking::BookingRepository;
use shared::{config::BookingConfig, error::AppResult};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

/// Removes pending bookings that were never paid within the configured
/// time-to-live. Returns the number of removed bookings.
pub async fn sweep_stale_pending(
    repository: &dyn BookingRepository,
    pending_ttl_hours: i64,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let cutoff = now - chrono::Duration::hours(pending_ttl_hours);
    let removed = repository.delete_stale_pending(cutoff).await?;
    if removed > 0 {
        tracing::info!(removed, %cutoff, "purged stale pending bookings");
    }
    Ok(removed)
}

// shutdown に値が送られる（もしくは送信側が破棄される）まで定期実行する
pub fn spawn_stale_pending_sweeper(
    repository: Arc<dyn BookingRepository>,
    config: BookingConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.sweep_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) =
                        sweep_stale_pending(repository.as_ref(), config.pending_ttl_hours, Utc::now()).await
                    {
                        tracing::error!(
                            error.cause_chain = ?e,
                            error.message = %e,
                            "stale pending sweep failed"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("stale pending sweeper stopped");
    })
}
