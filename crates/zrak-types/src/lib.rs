//! Platform-agnostic types for ARSO air-quality telemetry.
//!
//! This crate provides the shared data model used by the feed parsers, the
//! caching service and any out-of-process consumer of the published payload.
//!
//! # Features
//!
//! - Station and measurement records
//! - Chart points for primary-pollutant series
//! - Air-quality severity levels
//! - Error types for document parsing
//!
//! # Example
//!
//! ```
//! use zrak_types::{Measurement, Pollutant};
//!
//! let mut m = Measurement::new("E403");
//! m.pm10 = Some(31.0);
//! assert_eq!(m.primary_pollutant(), Pollutant::Pm10);
//! assert_eq!(m.primary_value(), Some(31.0));
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{AirQualityLevel, ChartPoint, Measurement, Pollutant, Station};
