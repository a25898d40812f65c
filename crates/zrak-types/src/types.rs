//! Core types for ARSO air-quality data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A fixed-location monitoring station.
///
/// Stations are keyed by their short ARSO code (e.g. `"E403"`); two stations
/// with the same code are the same station.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Station {
    /// Unique station code.
    pub code: String,
    /// Display name of the measuring site. Falls back to the code.
    pub name: String,
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
}

impl Station {
    /// Create a station, using the code as the name when `name` is blank.
    pub fn new(code: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let code = code.into();
        let name = name.into();
        let name = if name.trim().is_empty() { code.clone() } else { name };
        Self {
            code,
            name,
            latitude,
            longitude,
        }
    }
}

/// Pollutants reported by the hourly feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Pollutant {
    /// Fine particulate matter (≤ 2.5 µm).
    Pm25,
    /// Coarse particulate matter (≤ 10 µm).
    Pm10,
    /// Nitrogen dioxide.
    No2,
    /// Ozone.
    O3,
    /// Sulphur dioxide.
    So2,
    /// Carbon monoxide.
    Co,
}

impl Pollutant {
    /// All pollutants in feed order.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Co,
    ];

    /// Short chemical label, e.g. `"PM2.5"`.
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
            Pollutant::Co => "CO",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One reporting interval's pollutant readings for one station.
///
/// Every value is optional: `None` means "not reported for this interval",
/// which is distinct from a reported zero.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Code of the station this measurement belongs to.
    pub station_code: String,
    /// Start of the reporting interval.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::rfc3339::option")
    )]
    pub interval_start: Option<OffsetDateTime>,
    /// End of the reporting interval.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::rfc3339::option")
    )]
    pub interval_end: Option<OffsetDateTime>,
    /// PM2.5 in µg/m³.
    pub pm25: Option<f64>,
    /// PM10 in µg/m³.
    pub pm10: Option<f64>,
    /// NO2 in µg/m³.
    pub no2: Option<f64>,
    /// O3 in µg/m³.
    pub o3: Option<f64>,
    /// SO2 in µg/m³.
    pub so2: Option<f64>,
    /// CO in mg/m³.
    pub co: Option<f64>,
}

impl Measurement {
    /// Create an empty measurement for a station.
    pub fn new(station_code: impl Into<String>) -> Self {
        Self {
            station_code: station_code.into(),
            ..Self::default()
        }
    }

    /// The effective timestamp: interval end if present, else interval start.
    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.interval_end.or(self.interval_start)
    }

    /// Value reported for a single pollutant.
    pub fn value(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::No2 => self.no2,
            Pollutant::O3 => self.o3,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
        }
    }

    /// The pollutant used for charting and classification.
    ///
    /// PM2.5 when reported, otherwise PM10 (even when PM10 is also absent).
    pub fn primary_pollutant(&self) -> Pollutant {
        if self.pm25.is_some() {
            Pollutant::Pm25
        } else {
            Pollutant::Pm10
        }
    }

    /// PM2.5 if present, else PM10.
    pub fn primary_value(&self) -> Option<f64> {
        self.pm25.or(self.pm10)
    }

    /// Project this measurement onto a chart point.
    ///
    /// Returns `None` without an effective timestamp, without a primary value,
    /// or when the primary value is negative (sensor error codes).
    pub fn chart_point(&self) -> Option<ChartPoint> {
        let timestamp = self.last_update()?;
        let value = self.primary_value()?;
        (value >= 0.0).then_some(ChartPoint { timestamp, value })
    }
}

/// A single point of a primary-pollutant time series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChartPoint {
    /// When the value was measured.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Concentration in µg/m³, never negative.
    pub value: f64,
}

/// Air-quality severity level.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new levels
/// in future versions without breaking downstream code.
///
/// # Ordering
///
/// Levels are ordered by severity with `NoData` lowest:
/// `NoData < Good < Moderate < UnhealthySensitive < Unhealthy < VeryUnhealthy`.
///
/// ```
/// use zrak_types::AirQualityLevel;
///
/// assert!(AirQualityLevel::Unhealthy > AirQualityLevel::Moderate);
/// assert!(AirQualityLevel::Good > AirQualityLevel::NoData);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[non_exhaustive]
pub enum AirQualityLevel {
    /// No usable reading.
    NoData,
    /// Good air quality.
    Good,
    /// Moderate air quality.
    Moderate,
    /// Unhealthy for sensitive groups (PM2.5 scale only).
    UnhealthySensitive,
    /// Unhealthy.
    Unhealthy,
    /// Very unhealthy.
    VeryUnhealthy,
}

impl AirQualityLevel {
    /// All levels, least to most severe.
    pub const ALL: [AirQualityLevel; 6] = [
        AirQualityLevel::NoData,
        AirQualityLevel::Good,
        AirQualityLevel::Moderate,
        AirQualityLevel::UnhealthySensitive,
        AirQualityLevel::Unhealthy,
        AirQualityLevel::VeryUnhealthy,
    ];

    /// Whether the level carries a reading.
    pub fn has_data(&self) -> bool {
        !matches!(self, AirQualityLevel::NoData)
    }
}

impl fmt::Display for AirQualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirQualityLevel::NoData => write!(f, "No data"),
            AirQualityLevel::Good => write!(f, "Good"),
            AirQualityLevel::Moderate => write!(f, "Moderate"),
            AirQualityLevel::UnhealthySensitive => write!(f, "Unhealthy for sensitive groups"),
            AirQualityLevel::Unhealthy => write!(f, "Unhealthy"),
            AirQualityLevel::VeryUnhealthy => write!(f, "Very unhealthy"),
        }
    }
}
