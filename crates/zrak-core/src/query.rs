//! Read-side helpers over snapshots and historical series.

use serde::{Deserialize, Serialize};
use time::Duration;

use zrak_types::{AirQualityLevel, ChartPoint, Measurement, Station};

use crate::service::Snapshot;
use crate::thresholds::classify;

/// A station joined with its latest measurement and classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationItem {
    /// The station.
    pub station: Station,
    /// Latest measurement, if the hourly feed reported one.
    pub measurement: Option<Measurement>,
    /// Classification of the latest particulate values.
    pub level: AirQualityLevel,
    /// PM2.5 if reported, else PM10.
    pub primary_value: Option<f64>,
    /// `"PM2.5"` when PM2.5 was reported, else `"PM10"`.
    pub primary_label: &'static str,
}

impl StationItem {
    /// Join a station with its measurement.
    pub fn new(station: Station, measurement: Option<Measurement>) -> Self {
        let (level, primary_value, primary_label) = match &measurement {
            Some(m) => (
                classify(m.pm25, m.pm10),
                m.primary_value(),
                m.primary_pollutant().label(),
            ),
            None => (AirQualityLevel::NoData, None, "PM10"),
        };
        Self {
            station,
            measurement,
            level,
            primary_value,
            primary_label,
        }
    }
}

/// List every station in the snapshot with its classified measurement.
///
/// Order follows the snapshot (case-insensitive by name).
pub fn list_stations(snapshot: &Snapshot) -> Vec<StationItem> {
    snapshot
        .stations
        .iter()
        .map(|station| {
            StationItem::new(
                station.clone(),
                snapshot.measurements_by_code.get(&station.code).cloned(),
            )
        })
        .collect()
}

/// Chart points within `window` of the newest point, ascending.
///
/// Measurements without a timestamp or with a negative primary value are
/// skipped. The window is anchored at the newest remaining point, not at the
/// current time, so an old series still yields a full window.
pub fn history_in_window(measurements: &[Measurement], window: Duration) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = measurements.iter().filter_map(Measurement::chart_point).collect();
    points.sort_by_key(|p| p.timestamp);

    let Some(reference) = points.last().map(|p| p.timestamp) else {
        return points;
    };
    // A window reaching past the representable range keeps everything.
    if let Some(from) = reference.checked_sub(window) {
        points.retain(|p| p.timestamp >= from);
    }
    points
}

/// Chart time ranges offered to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartRange {
    /// The last 24 hours.
    #[default]
    Last24Hours,
    /// The last 7 days.
    Last7Days,
}

impl ChartRange {
    /// Length of the range.
    pub fn duration(&self) -> Duration {
        match self {
            ChartRange::Last24Hours => Duration::hours(24),
            ChartRange::Last7Days => Duration::days(7),
        }
    }

    /// Parse a short form such as `24h` or `7d`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "24h" | "1d" | "day" => Some(ChartRange::Last24Hours),
            "7d" | "168h" | "week" => Some(ChartRange::Last7Days),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn at(minutes: i64, pm25: Option<f64>, pm10: Option<f64>) -> Measurement {
        Measurement {
            station_code: "E403".to_string(),
            interval_end: Some(datetime!(2024-01-15 00:00 UTC) + Duration::minutes(minutes)),
            pm25,
            pm10,
            ..Measurement::default()
        }
    }

    // --- list_stations ---

    #[test]
    fn test_list_stations_joins_and_classifies() {
        let mut measurements = HashMap::new();
        measurements.insert("E1".to_string(), at(0, Some(40.0), Some(10.0)));
        measurements.insert("E2".to_string(), at(0, None, Some(10.0)));
        let snapshot = Snapshot {
            stations: vec![
                Station::new("E1", "Celje", 46.2, 15.2),
                Station::new("E2", "Koper", 45.5, 13.7),
                Station::new("E3", "Novo mesto", 45.8, 15.1),
            ],
            measurements_by_code: measurements,
            fetched_at: OffsetDateTime::UNIX_EPOCH,
        };

        let items = list_stations(&snapshot);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].level, AirQualityLevel::UnhealthySensitive);
        assert_eq!(items[0].primary_value, Some(40.0));
        assert_eq!(items[0].primary_label, "PM2.5");

        assert_eq!(items[1].level, AirQualityLevel::Good);
        assert_eq!(items[1].primary_label, "PM10");

        assert!(items[2].measurement.is_none());
        assert_eq!(items[2].level, AirQualityLevel::NoData);
        assert!(items[2].primary_value.is_none());
    }

    // --- history_in_window ---

    #[test]
    fn test_window_keeps_last_hour_inclusive() {
        let series: Vec<_> = [0, 60, 120, 180].iter().map(|m| at(*m, Some(*m as f64), None)).collect();
        let points = history_in_window(&series, Duration::hours(1));
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![120.0, 180.0]);
    }

    #[test]
    fn test_window_sorts_and_skips_unusable() {
        let mut undated = Measurement::new("E403");
        undated.pm25 = Some(3.0);
        let series = vec![
            at(60, Some(2.0), None),
            at(0, Some(1.0), None),
            at(30, Some(-1.0), Some(5.0)),
            at(45, None, None),
            undated,
        ];
        let points = history_in_window(&series, Duration::days(7));
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_window_beyond_representable_range_keeps_all() {
        let series: Vec<_> = [0, 60].iter().map(|m| at(*m, Some(1.0), None)).collect();
        assert_eq!(history_in_window(&series, Duration::MAX).len(), 2);

        let earliest = Measurement {
            station_code: "E403".to_string(),
            interval_end: Some(time::PrimitiveDateTime::MIN.assume_utc()),
            pm25: Some(4.0),
            ..Measurement::default()
        };
        let points = history_in_window(&[earliest], Duration::days(7));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 4.0);
    }

    #[test]
    fn test_window_empty_input() {
        assert!(history_in_window(&[], Duration::hours(24)).is_empty());
    }

    // --- ChartRange ---

    #[test]
    fn test_chart_range_duration() {
        assert_eq!(ChartRange::Last24Hours.duration(), Duration::hours(24));
        assert_eq!(ChartRange::Last7Days.duration(), Duration::hours(168));
        assert_eq!(ChartRange::default(), ChartRange::Last24Hours);
    }

    #[test]
    fn test_chart_range_parse() {
        assert_eq!(ChartRange::parse("24h"), Some(ChartRange::Last24Hours));
        assert_eq!(ChartRange::parse(" 7D "), Some(ChartRange::Last7Days));
        assert_eq!(ChartRange::parse("month"), None);
    }
}
