//! Shared payload for out-of-process consumers.
//!
//! After every successful latest refresh the service writes a compact JSON
//! document describing each station: its latest pollutant values and two
//! ready-to-draw primary-pollutant series (24 hours and 7 days). Consumers
//! such as home-screen widgets read this file without touching the network.
//!
//! Keys are camelCase and timestamps RFC 3339 with whole seconds:
//!
//! ```json
//! {
//!   "generatedAt": "2024-01-15T10:05:00Z",
//!   "stations": [
//!     {
//!       "code": "E403",
//!       "name": "LJ Center",
//!       "lastUpdate": "2024-01-15T10:00:00Z",
//!       "pm25": 12.0, "pm10": 20.0, "no2": null, "o3": null, "so2": null, "co": null,
//!       "chart24h": [{ "timestamp": "2024-01-15T10:00:00Z", "value": 12.0 }],
//!       "chart7d": [{ "timestamp": "2024-01-15T10:00:00Z", "value": 12.0 }]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use zrak_types::{AirQualityLevel, ChartPoint, Measurement, Station};

use crate::error::Result;
use crate::query::{ChartRange, history_in_window};
use crate::thresholds::classify;
use crate::traits::PayloadSink;

/// File name of the shared payload inside the shared directory.
pub const PAYLOAD_FILENAME: &str = "air_quality_widget_payload.json";

/// Default directory shared with consumers: `<data_local_dir>/zrak`.
pub fn default_shared_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zrak")
}

/// Window of the short chart series.
pub const SHORT_SERIES_WINDOW: Duration = Duration::hours(24);
/// Window of the long chart series.
pub const LONG_SERIES_WINDOW: Duration = Duration::hours(24 * 7);

/// Snapshot of all stations for consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPayload {
    /// When the payload was built.
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Stations in snapshot order.
    pub stations: Vec<SharedStation>,
}

impl SharedPayload {
    /// The station with `code`, or the first station when `code` is absent,
    /// blank or unknown.
    pub fn station_or_first(&self, code: Option<&str>) -> Option<&SharedStation> {
        code.map(str::trim)
            .filter(|c| !c.is_empty())
            .and_then(|c| self.stations.iter().find(|s| s.code == c))
            .or_else(|| self.stations.first())
    }
}

/// One station's entry in the shared payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedStation {
    /// Station code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// End of the latest measurement interval.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_update: Option<OffsetDateTime>,
    /// PM2.5 in µg/m³.
    #[serde(default)]
    pub pm25: Option<f64>,
    /// PM10 in µg/m³.
    #[serde(default)]
    pub pm10: Option<f64>,
    /// NO2 in µg/m³.
    #[serde(default)]
    pub no2: Option<f64>,
    /// O3 in µg/m³.
    #[serde(default)]
    pub o3: Option<f64>,
    /// SO2 in µg/m³.
    #[serde(default)]
    pub so2: Option<f64>,
    /// CO in mg/m³.
    #[serde(default)]
    pub co: Option<f64>,
    /// Primary-pollutant points over the last 24 hours.
    #[serde(default)]
    pub chart24h: Vec<ChartPoint>,
    /// Primary-pollutant points over the last 7 days.
    #[serde(default)]
    pub chart7d: Vec<ChartPoint>,
}

impl SharedStation {
    /// Classification of the latest particulate values.
    pub fn level(&self) -> AirQualityLevel {
        classify(self.pm25, self.pm10)
    }

    /// Series for a range, falling back to the other series when empty.
    pub fn chart(&self, range: ChartRange) -> &[ChartPoint] {
        let (preferred, other) = match range {
            ChartRange::Last24Hours => (&self.chart24h, &self.chart7d),
            ChartRange::Last7Days => (&self.chart7d, &self.chart24h),
        };
        if preferred.is_empty() { other } else { preferred }
    }
}

/// Build the shared payload.
///
/// `stations` order is preserved. Stations without a latest measurement or
/// history are still listed, with empty values.
pub fn build_payload(
    stations: &[Station],
    latest_by_code: &HashMap<String, Measurement>,
    historical_by_code: &HashMap<String, Vec<Measurement>>,
    generated_at: OffsetDateTime,
) -> SharedPayload {
    let stations = stations
        .iter()
        .map(|station| {
            let latest = latest_by_code.get(&station.code);
            let history = historical_by_code
                .get(&station.code)
                .map(Vec::as_slice)
                .unwrap_or_default();

            SharedStation {
                code: station.code.clone(),
                name: station.name.clone(),
                last_update: latest.and_then(Measurement::last_update),
                pm25: latest.and_then(|m| m.pm25),
                pm10: latest.and_then(|m| m.pm10),
                no2: latest.and_then(|m| m.no2),
                o3: latest.and_then(|m| m.o3),
                so2: latest.and_then(|m| m.so2),
                co: latest.and_then(|m| m.co),
                chart24h: windowed_series(history, latest, SHORT_SERIES_WINDOW),
                chart7d: windowed_series(history, latest, LONG_SERIES_WINDOW),
            }
        })
        .collect();

    SharedPayload {
        generated_at: generated_at.replace_nanosecond(0).unwrap_or(generated_at),
        stations,
    }
}

/// Primary-pollutant series for one station.
///
/// Uses the history within `window` of its newest point. With no usable
/// history, falls back to a single point from `fallback`.
pub fn windowed_series(
    history: &[Measurement],
    fallback: Option<&Measurement>,
    window: Duration,
) -> Vec<ChartPoint> {
    let points = history_in_window(history, window);
    if !points.is_empty() {
        return points;
    }
    fallback.and_then(Measurement::chart_point).into_iter().collect()
}

/// Payload file in a shared directory.
#[derive(Debug, Clone)]
pub struct FilePayloadStore {
    path: PathBuf,
}

impl FilePayloadStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`PAYLOAD_FILENAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PAYLOAD_FILENAME))
    }

    /// Path of the payload file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the payload file atomically.
    pub fn write(&self, payload: &SharedPayload) -> Result<()> {
        let json = serde_json::to_vec(payload)?;
        write_atomic(&self.path, &json)?;
        debug!(
            "Wrote payload with {} stations to {:?}",
            payload.stations.len(),
            self.path
        );
        Ok(())
    }

    /// Read the payload. Missing or unreadable files yield `None`.
    pub fn read(&self) -> Option<SharedPayload> {
        let data = fs::read(&self.path).ok()?;
        match serde_json::from_slice(&data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Ignoring unreadable payload {:?}: {}", self.path, e);
                None
            }
        }
    }
}

#[async_trait]
impl PayloadSink for FilePayloadStore {
    async fn publish(&self, payload: &SharedPayload) -> Result<()> {
        let store = self.clone();
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || store.write(&payload)).await?
    }
}

/// Write `data` to a sibling temp file, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, data)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
