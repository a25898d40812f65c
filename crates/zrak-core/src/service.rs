//! Fetch orchestration and caching of ARSO data.
//!
//! [`ArsoService`] owns the only mutable state in the crate: the latest
//! [`Snapshot`] and the 7-day [`HistoricalIndex`]. Both are immutable values
//! behind `Arc` and are swapped whole, so readers never observe a partially
//! refreshed cache.
//!
//! # Cache Behavior
//!
//! | Cache | Reused without network | Refreshed when | On failure |
//! |-------|------------------------|----------------|------------|
//! | Latest snapshot | always, unless forced | forced, or empty | previous snapshot |
//! | Historical index | within 15 minutes, unless forced | older, forced, or empty | previous series |
//!
//! The historical index is also refreshed opportunistically as part of every
//! latest refresh, so the published payload carries charts. That refresh is
//! best effort and never fails the latest refresh.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zrak_core::{ArsoService, FeedUrls, HttpFeedSource};
//!
//! # async fn example() -> zrak_core::Result<()> {
//! let source = HttpFeedSource::new(FeedUrls::default())?;
//! let service = ArsoService::new(Arc::new(source));
//!
//! let snapshot = service.fetch_latest_snapshot(false).await?;
//! println!("{} stations", snapshot.stations.len());
//!
//! let history = service.fetch_historical_measurements("E403", false).await?;
//! println!("{} hourly values", history.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::task::spawn_blocking;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use zrak_types::{ChartPoint, Measurement, ParseResult, Station};

use crate::error::Result;
use crate::feeds::Feed;
use crate::publisher::build_payload;
use crate::query::history_in_window;
use crate::reconcile::{HistoricalIndex, index_latest, merge_stations};
use crate::traits::{FeedSource, PayloadSink};
use crate::xml::{parse_measurements, parse_stations};

/// Maximum age of the historical index before a non-forced read refetches.
pub const HISTORICAL_TTL: Duration = Duration::from_secs(15 * 60);

/// Stations and their latest measurements at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Stations sorted case-insensitively by name.
    pub stations: Vec<Station>,
    /// Latest measurement per station code.
    pub measurements_by_code: HashMap<String, Measurement>,
    /// When the snapshot was fetched.
    pub fetched_at: OffsetDateTime,
}

impl Snapshot {
    /// Latest measurement for a station.
    pub fn measurement(&self, code: &str) -> Option<&Measurement> {
        self.measurements_by_code.get(code)
    }

    /// Station by code.
    pub fn station(&self, code: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.code == code)
    }

    /// The newest measurement timestamp, or the fetch time when no
    /// measurement carries one.
    pub fn last_updated(&self) -> OffsetDateTime {
        self.measurements_by_code
            .values()
            .filter_map(Measurement::last_update)
            .max()
            .unwrap_or(self.fetched_at)
    }
}

/// Freshness of the data being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStatus {
    /// The last latest refresh succeeded.
    Live,
    /// The last latest refresh failed; an older snapshot is served.
    Stale,
    /// Nothing has been fetched yet.
    Unavailable,
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataStatus::Live => write!(f, "live"),
            DataStatus::Stale => write!(f, "stale"),
            DataStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug)]
struct CachedHistory {
    index: Arc<HistoricalIndex>,
    refreshed_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    history: Option<CachedHistory>,
    last_refresh_failed: bool,
}

/// Caching front for the ARSO feeds.
pub struct ArsoService {
    source: Arc<dyn FeedSource>,
    sink: Option<Arc<dyn PayloadSink>>,
    historical_ttl: Duration,
    state: RwLock<CacheState>,
    // Held for the whole of a refresh so results land in the order requested.
    latest_refresh: Mutex<()>,
    history_refresh: Mutex<()>,
}

impl fmt::Debug for ArsoService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArsoService")
            .field("historical_ttl", &self.historical_ttl)
            .field("publishes", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl ArsoService {
    /// Create a service reading from `source`, without payload publishing.
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            sink: None,
            historical_ttl: HISTORICAL_TTL,
            state: RwLock::new(CacheState::default()),
            latest_refresh: Mutex::new(()),
            history_refresh: Mutex::new(()),
        }
    }

    /// Publish the shared payload to `sink` after each successful refresh.
    pub fn with_payload_sink(mut self, sink: Arc<dyn PayloadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the historical cache lifetime.
    pub fn with_historical_ttl(mut self, ttl: Duration) -> Self {
        self.historical_ttl = ttl;
        self
    }

    /// The current snapshot, without network access.
    pub async fn cached_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// Freshness of the snapshot being served.
    pub async fn refresh_status(&self) -> DataStatus {
        let state = self.state.read().await;
        match (&state.snapshot, state.last_refresh_failed) {
            (None, _) => DataStatus::Unavailable,
            (Some(_), true) => DataStatus::Stale,
            (Some(_), false) => DataStatus::Live,
        }
    }

    /// Latest stations and measurements.
    ///
    /// Returns the cached snapshot without network access unless
    /// `force_refresh` is set or nothing is cached yet. When a refresh fails
    /// and a snapshot is cached, the cached snapshot is returned unchanged.
    pub async fn fetch_latest_snapshot(&self, force_refresh: bool) -> Result<Arc<Snapshot>> {
        if !force_refresh && let Some(snapshot) = self.cached_snapshot().await {
            debug!("Serving cached snapshot from {}", snapshot.fetched_at);
            return Ok(snapshot);
        }

        let _refresh = self.latest_refresh.lock().await;
        // Another caller may have filled the cache while we waited.
        if !force_refresh && let Some(snapshot) = self.cached_snapshot().await {
            return Ok(snapshot);
        }

        match self.refresh_latest(force_refresh).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                let mut state = self.state.write().await;
                let Some(snapshot) = state.snapshot.clone() else {
                    return Err(e);
                };
                state.last_refresh_failed = true;
                warn!("Latest refresh failed, serving cached snapshot: {}", e);
                Ok(snapshot)
            }
        }
    }

    /// Hourly history of one station over the past seven days, ascending.
    ///
    /// A blank code yields an empty list without network access. Within the
    /// cache lifetime the cached index answers (an unknown code yields an
    /// empty list). When a refresh fails, the previously cached series for the
    /// code is returned regardless of its age.
    pub async fn fetch_historical_measurements(
        &self,
        code: &str,
        force_refresh: bool,
    ) -> Result<Vec<Measurement>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(Vec::new());
        }

        match self.history_index(force_refresh).await {
            Ok(index) => Ok(index.series(code).map(<[_]>::to_vec).unwrap_or_default()),
            Err(e) => {
                let state = self.state.read().await;
                let fallback = state
                    .history
                    .as_ref()
                    .and_then(|cached| cached.index.series(code));
                match fallback {
                    Some(series) => {
                        warn!("History refresh failed, serving cached series for {}: {}", code, e);
                        Ok(series.to_vec())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Chart points of one station within `window` of its newest value.
    pub async fn station_history(
        &self,
        code: &str,
        window: time::Duration,
        force_refresh: bool,
    ) -> Result<Vec<ChartPoint>> {
        let series = self.fetch_historical_measurements(code, force_refresh).await?;
        Ok(history_in_window(&series, window))
    }

    async fn refresh_latest(&self, force_refresh: bool) -> Result<Arc<Snapshot>> {
        info!("Refreshing latest snapshot");

        let (hourly, directory) = tokio::try_join!(
            self.source.fetch(Feed::LatestHourly),
            self.source.fetch(Feed::StationDirectory),
        )?;

        let hourly = Arc::new(hourly);
        let hourly_for_stations = Arc::clone(&hourly);
        let (measurements, directory_stations, hourly_stations) = tokio::join!(
            spawn_blocking(move || parse_measurements(&hourly)),
            spawn_blocking(move || parse_stations(&directory)),
            spawn_blocking(move || parse_stations(&hourly_for_stations)),
        );

        let measurements = measurements??;
        let stations = match (flatten(directory_stations), flatten(hourly_stations)) {
            (Ok(primary), Ok(secondary)) => merge_stations(primary, secondary),
            (Ok(primary), Err(e)) => {
                warn!("Ignoring unreadable stations in hourly feed: {}", e);
                merge_stations(primary, Vec::new())
            }
            (Err(e), Ok(secondary)) => {
                warn!("Ignoring unreadable station directory: {}", e);
                merge_stations(Vec::new(), secondary)
            }
            (Err(e), Err(_)) => return Err(e),
        };
        let latest = index_latest(measurements);

        let history = self.history_best_effort(force_refresh).await;

        let fetched_at = OffsetDateTime::now_utc();
        if let Some(sink) = &self.sink {
            let payload = build_payload(&stations, &latest, history.by_code(), fetched_at);
            if let Err(e) = sink.publish(&payload).await {
                warn!("Failed to publish payload: {}", e);
            }
        }

        let snapshot = Arc::new(Snapshot {
            stations,
            measurements_by_code: latest,
            fetched_at,
        });

        {
            let mut state = self.state.write().await;
            state.snapshot = Some(Arc::clone(&snapshot));
            state.last_refresh_failed = false;
        }

        info!(
            "Snapshot refreshed: {} stations, {} measurements",
            snapshot.stations.len(),
            snapshot.measurements_by_code.len()
        );
        Ok(snapshot)
    }

    /// The cached index when fresh, else a newly fetched one.
    async fn history_index(&self, force_refresh: bool) -> Result<Arc<HistoricalIndex>> {
        if !force_refresh && let Some(index) = self.fresh_history().await {
            debug!("Serving cached history ({} stations)", index.len());
            return Ok(index);
        }

        let _refresh = self.history_refresh.lock().await;
        if !force_refresh && let Some(index) = self.fresh_history().await {
            return Ok(index);
        }

        let body = self.source.fetch(Feed::SevenDayHourly).await?;
        let measurements = spawn_blocking(move || parse_measurements(&body)).await??;
        let index = Arc::new(HistoricalIndex::from_measurements(
            measurements,
            OffsetDateTime::now_utc(),
        ));

        self.state.write().await.history = Some(CachedHistory {
            index: Arc::clone(&index),
            refreshed_at: Instant::now(),
        });
        info!("History refreshed: {} stations", index.len());
        Ok(index)
    }

    /// History for the payload: refreshed if due, else whatever is cached.
    async fn history_best_effort(&self, force_refresh: bool) -> Arc<HistoricalIndex> {
        match self.history_index(force_refresh).await {
            Ok(index) => index,
            Err(e) => {
                warn!("History refresh failed, keeping previous index: {}", e);
                self.state
                    .read()
                    .await
                    .history
                    .as_ref()
                    .map(|cached| Arc::clone(&cached.index))
                    .unwrap_or_default()
            }
        }
    }

    async fn fresh_history(&self) -> Option<Arc<HistoricalIndex>> {
        let state = self.state.read().await;
        let cached = state.history.as_ref()?;
        (cached.refreshed_at.elapsed() <= self.historical_ttl).then(|| Arc::clone(&cached.index))
    }
}

fn flatten<T>(
    joined: std::result::Result<ParseResult<T>, tokio::task::JoinError>,
) -> Result<T> {
    Ok(joined??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn measurement(code: &str, end: Option<OffsetDateTime>) -> Measurement {
        Measurement {
            station_code: code.to_string(),
            interval_end: end,
            ..Measurement::default()
        }
    }

    #[test]
    fn test_snapshot_last_updated_uses_newest_measurement() {
        let mut measurements = HashMap::new();
        measurements.insert("E1".to_string(), measurement("E1", Some(datetime!(2024-01-15 09:00 UTC))));
        measurements.insert("E2".to_string(), measurement("E2", Some(datetime!(2024-01-15 10:00 UTC))));
        measurements.insert("E3".to_string(), measurement("E3", None));

        let snapshot = Snapshot {
            stations: Vec::new(),
            measurements_by_code: measurements,
            fetched_at: datetime!(2024-01-15 10:05 UTC),
        };
        assert_eq!(snapshot.last_updated(), datetime!(2024-01-15 10:00 UTC));
        assert!(snapshot.measurement("E1").is_some());
        assert!(snapshot.measurement("E9").is_none());
    }

    #[test]
    fn test_snapshot_last_updated_falls_back_to_fetch_time() {
        let snapshot = Snapshot {
            stations: vec![Station::new("E1", "Koper", 45.5, 13.7)],
            measurements_by_code: HashMap::new(),
            fetched_at: datetime!(2024-01-15 10:05 UTC),
        };
        assert_eq!(snapshot.last_updated(), datetime!(2024-01-15 10:05 UTC));
        assert_eq!(snapshot.station("E1").map(|s| s.name.as_str()), Some("Koper"));
    }

    #[test]
    fn test_data_status_display() {
        assert_eq!(DataStatus::Live.to_string(), "live");
        assert_eq!(DataStatus::Stale.to_string(), "stale");
        assert_eq!(serde_json::to_string(&DataStatus::Unavailable).unwrap(), "\"unavailable\"");
    }
}
