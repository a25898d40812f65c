//! Particulate-matter breakpoints and air-quality classification.
//!
//! PM2.5 is the primary metric; PM10 is consulted only when PM2.5 was not
//! reported. Each breakpoint is an inclusive upper bound.
//!
//! | Level                | PM2.5 (µg/m³) | PM10 (µg/m³) |
//! |----------------------|---------------|--------------|
//! | Good                 | ≤ 15          | ≤ 25         |
//! | Moderate             | ≤ 35          | ≤ 50         |
//! | Unhealthy (sensitive)| ≤ 55          | n/a          |
//! | Unhealthy            | ≤ 100         | ≤ 100        |
//! | Very unhealthy       | > 100         | > 100        |
//!
//! Negative values are sensor error codes and classify as
//! [`AirQualityLevel::NoData`].
//!
//! # Example
//!
//! ```
//! use zrak_core::{AirQualityLevel, classify};
//!
//! assert_eq!(classify(Some(12.0), None), AirQualityLevel::Good);
//! assert_eq!(classify(None, Some(60.0)), AirQualityLevel::Unhealthy);
//! assert_eq!(classify(None, None), AirQualityLevel::NoData);
//! ```

use serde::{Deserialize, Serialize};

use zrak_types::{AirQualityLevel, Measurement};

/// Upper bounds for the PM2.5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pm25Breakpoints {
    /// Upper bound for Good.
    pub good_max: f64,
    /// Upper bound for Moderate.
    pub moderate_max: f64,
    /// Upper bound for Unhealthy for sensitive groups.
    pub sensitive_max: f64,
    /// Upper bound for Unhealthy.
    pub unhealthy_max: f64,
    // Above unhealthy_max is VeryUnhealthy
}

impl Default for Pm25Breakpoints {
    fn default() -> Self {
        Self {
            good_max: 15.0,
            moderate_max: 35.0,
            sensitive_max: 55.0,
            unhealthy_max: 100.0,
        }
    }
}

/// Upper bounds for the PM10 scale, which has no sensitive-groups band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pm10Breakpoints {
    /// Upper bound for Good.
    pub good_max: f64,
    /// Upper bound for Moderate.
    pub moderate_max: f64,
    /// Upper bound for Unhealthy.
    pub unhealthy_max: f64,
}

impl Default for Pm10Breakpoints {
    fn default() -> Self {
        Self {
            good_max: 25.0,
            moderate_max: 50.0,
            unhealthy_max: 100.0,
        }
    }
}

/// Classifier for particulate readings.
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    pm25: Pm25Breakpoints,
    pm10: Pm10Breakpoints,
}

impl Thresholds {
    /// Create a classifier with custom breakpoints.
    pub fn new(pm25: Pm25Breakpoints, pm10: Pm10Breakpoints) -> Self {
        Self { pm25, pm10 }
    }

    /// PM2.5 breakpoints in use.
    pub fn pm25(&self) -> &Pm25Breakpoints {
        &self.pm25
    }

    /// PM10 breakpoints in use.
    pub fn pm10(&self) -> &Pm10Breakpoints {
        &self.pm10
    }

    /// Classify a PM2.5 concentration.
    pub fn evaluate_pm25(&self, value: f64) -> AirQualityLevel {
        let b = &self.pm25;
        if value < 0.0 || value.is_nan() {
            AirQualityLevel::NoData
        } else if value <= b.good_max {
            AirQualityLevel::Good
        } else if value <= b.moderate_max {
            AirQualityLevel::Moderate
        } else if value <= b.sensitive_max {
            AirQualityLevel::UnhealthySensitive
        } else if value <= b.unhealthy_max {
            AirQualityLevel::Unhealthy
        } else {
            AirQualityLevel::VeryUnhealthy
        }
    }

    /// Classify a PM10 concentration.
    pub fn evaluate_pm10(&self, value: f64) -> AirQualityLevel {
        let b = &self.pm10;
        if value < 0.0 || value.is_nan() {
            AirQualityLevel::NoData
        } else if value <= b.good_max {
            AirQualityLevel::Good
        } else if value <= b.moderate_max {
            AirQualityLevel::Moderate
        } else if value <= b.unhealthy_max {
            AirQualityLevel::Unhealthy
        } else {
            AirQualityLevel::VeryUnhealthy
        }
    }

    /// Classify a reading pair. A reported PM2.5 value always decides, even
    /// when it is an error code and PM10 is valid.
    pub fn classify(&self, pm25: Option<f64>, pm10: Option<f64>) -> AirQualityLevel {
        match (pm25, pm10) {
            (Some(pm25), _) => self.evaluate_pm25(pm25),
            (None, Some(pm10)) => self.evaluate_pm10(pm10),
            (None, None) => AirQualityLevel::NoData,
        }
    }

    /// Classify a measurement by its particulate values.
    pub fn evaluate_measurement(&self, measurement: &Measurement) -> AirQualityLevel {
        self.classify(measurement.pm25, measurement.pm10)
    }
}

/// Classify with the default breakpoints.
pub fn classify(pm25: Option<f64>, pm10: Option<f64>) -> AirQualityLevel {
    Thresholds::default().classify(pm25, pm10)
}
