//! Reconciliation of parsed feed records.
//!
//! The station list is assembled from two sources (the daily directory and
//! the hourly feed's own station attributes), and measurement lists are
//! indexed either as "latest per station" or as a per-station time series.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use time::OffsetDateTime;
use zrak_types::{Measurement, Station};

/// Union two station lists keyed by code.
///
/// Every station from `primary` is kept (the first occurrence wins when a
/// code repeats); `secondary` only contributes codes `primary` lacks. The
/// result is sorted case-insensitively by name, then by code.
pub fn merge_stations(primary: Vec<Station>, secondary: Vec<Station>) -> Vec<Station> {
    let mut by_code: HashMap<String, Station> = HashMap::with_capacity(primary.len());
    for station in primary.into_iter().chain(secondary) {
        if let Entry::Vacant(slot) = by_code.entry(station.code.clone()) {
            slot.insert(station);
        }
    }

    let mut stations: Vec<Station> = by_code.into_values().collect();
    sort_by_name(&mut stations);
    stations
}

/// Sort stations case-insensitively by name, breaking ties by code.
pub fn sort_by_name(stations: &mut [Station]) {
    stations.sort_by_cached_key(|s| (s.name.to_lowercase(), s.code.clone()));
}

/// Index measurements by station code. Later records replace earlier ones.
pub fn index_latest(measurements: Vec<Measurement>) -> HashMap<String, Measurement> {
    let mut index = HashMap::with_capacity(measurements.len());
    for measurement in measurements {
        index.insert(measurement.station_code.clone(), measurement);
    }
    index
}

/// Group measurements into per-station time series.
///
/// Within a station, records sharing an effective timestamp collapse to one:
/// a later duplicate replaces the kept record only when the kept record lacks
/// PM2.5 and the newcomer has it. Dated records are sorted ascending; records
/// with no timestamp follow them in arrival order.
pub fn group_historical(measurements: Vec<Measurement>) -> HashMap<String, Vec<Measurement>> {
    let mut grouped: HashMap<String, Vec<Measurement>> = HashMap::new();
    for measurement in measurements {
        grouped
            .entry(measurement.station_code.clone())
            .or_default()
            .push(measurement);
    }

    grouped
        .into_iter()
        .map(|(code, series)| (code, dedup_series(series)))
        .collect()
}

fn dedup_series(series: Vec<Measurement>) -> Vec<Measurement> {
    let mut dated: Vec<Measurement> = Vec::with_capacity(series.len());
    let mut slots: HashMap<OffsetDateTime, usize> = HashMap::new();
    let mut undated = Vec::new();

    for measurement in series {
        let Some(timestamp) = measurement.last_update() else {
            undated.push(measurement);
            continue;
        };
        match slots.entry(timestamp) {
            Entry::Occupied(slot) => {
                let kept = &mut dated[*slot.get()];
                if kept.pm25.is_none() && measurement.pm25.is_some() {
                    *kept = measurement;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(dated.len());
                dated.push(measurement);
            }
        }
    }

    dated.sort_by_key(Measurement::last_update);
    dated.extend(undated);
    dated
}

/// Per-station 7-day history, replaced wholesale on each refresh.
#[derive(Debug, Clone, Default)]
pub struct HistoricalIndex {
    series: HashMap<String, Vec<Measurement>>,
    fetched_at: Option<OffsetDateTime>,
}

impl HistoricalIndex {
    /// Build an index from a parsed 7-day feed.
    pub fn from_measurements(measurements: Vec<Measurement>, fetched_at: OffsetDateTime) -> Self {
        Self {
            series: group_historical(measurements),
            fetched_at: Some(fetched_at),
        }
    }

    /// Series for a station, ascending by timestamp.
    pub fn series(&self, code: &str) -> Option<&[Measurement]> {
        self.series.get(code).map(Vec::as_slice)
    }

    /// All series keyed by station code.
    pub fn by_code(&self) -> &HashMap<String, Vec<Measurement>> {
        &self.series
    }

    /// Wall-clock time of the fetch that produced this index.
    pub fn fetched_at(&self) -> Option<OffsetDateTime> {
        self.fetched_at
    }

    /// Number of stations with history.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the index holds no stations.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
