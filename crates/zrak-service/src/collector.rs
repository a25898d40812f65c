//! Background snapshot refresher.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use zrak_core::{ArsoService, DataStatus, Snapshot};

/// Periodically forces a refresh of the latest snapshot.
///
/// Each successful refresh also republishes the shared payload through the
/// service's payload sink.
pub struct Collector {
    service: Arc<ArsoService>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl Collector {
    /// Create a collector refreshing `service` every `interval`.
    pub fn new(service: Arc<ArsoService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token that stops the collector when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Spawn the refresh loop. The first refresh runs immediately.
    pub fn start(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let period = self.interval;
        let token = self.cancel_token.clone();

        info!("Starting collector (interval: {}s)", period.as_secs());

        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut consecutive_failures = 0u32;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Collector stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        match collect_once(&service).await {
                            Ok(snapshot) => {
                                if consecutive_failures > 0 {
                                    info!("Refresh recovered after {} failure(s)", consecutive_failures);
                                }
                                consecutive_failures = 0;
                                debug!(
                                    "Refreshed {} station(s), {} measurement(s)",
                                    snapshot.stations.len(),
                                    snapshot.measurements_by_code.len()
                                );
                            }
                            Err(e) => {
                                consecutive_failures += 1;
                                if consecutive_failures <= 3 {
                                    warn!("Refresh failed: {} (attempt {})", e, consecutive_failures);
                                } else if consecutive_failures == 4 {
                                    error!(
                                        "Refresh failed {} times in a row, will keep retrying silently",
                                        consecutive_failures
                                    );
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

/// Force one refresh of the latest snapshot.
///
/// A refresh that fell back to the cached snapshot counts as a failure.
pub async fn collect_once(service: &ArsoService) -> Result<Arc<Snapshot>, CollectorError> {
    let snapshot = service
        .fetch_latest_snapshot(true)
        .await
        .map_err(CollectorError::Refresh)?;

    match service.refresh_status().await {
        DataStatus::Stale => Err(CollectorError::Stale {
            fetched_at: snapshot.fetched_at,
        }),
        _ => Ok(snapshot),
    }
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to refresh: {0}")]
    Refresh(zrak_core::Error),
    #[error("Feeds unavailable, still serving snapshot from {fetched_at}")]
    Stale { fetched_at: time::OffsetDateTime },
}
