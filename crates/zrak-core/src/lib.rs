//! Feed parsing, reconciliation and caching for ARSO air-quality data.
//!
//! This crate turns the Slovenian Environment Agency's public XML feeds into a
//! consistent, cached view of monitoring stations and their pollutant
//! readings.
//!
//! # Features
//!
//! - **Field-tolerant parsers**: Station directory and hourly measurement feeds
//! - **Reconciliation**: Two station sources merged, measurements indexed and
//!   deduplicated into per-station series
//! - **Caching service**: Latest snapshot plus a 15-minute historical cache,
//!   with stale data served whenever a refresh fails
//! - **Classification**: PM2.5/PM10 breakpoints to severity levels
//! - **Shared payload**: Atomic JSON document for out-of-process consumers
//! - **Mock feeds**: Deterministic testing without network access
//!
//! # Data Flow
//!
//! | Step | Module |
//! |------|--------|
//! | Fetch the three feeds | [`feeds`] via [`FeedSource`] |
//! | Parse documents | [`xml`] |
//! | Merge stations, index measurements | [`reconcile`] |
//! | Cache and serve | [`service`] |
//! | Publish consumer payload | [`publisher`] via [`PayloadSink`] |
//! | Classify and window for display | [`thresholds`], [`query`] |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use zrak_core::{ArsoService, FeedUrls, FilePayloadStore, HttpFeedSource, list_stations};
//!
//! #[tokio::main]
//! async fn main() -> zrak_core::Result<()> {
//!     let source = HttpFeedSource::new(FeedUrls::default())?;
//!     let service = ArsoService::new(Arc::new(source))
//!         .with_payload_sink(Arc::new(FilePayloadStore::in_dir("/tmp/zrak")));
//!
//!     let snapshot = service.fetch_latest_snapshot(false).await?;
//!     for item in list_stations(&snapshot) {
//!         println!("{}: {}", item.station.name, item.level);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod feeds;
pub mod mock;
pub mod premium;
pub mod publisher;
pub mod query;
pub mod reconcile;
pub mod service;
pub mod thresholds;
pub mod traits;
pub mod xml;

pub use error::{Error, Result};
pub use feeds::{DEFAULT_TIMEOUT, Feed, FeedUrls, HttpFeedSource};
pub use mock::{MockFeedSource, RecordingPayloadSink};
pub use premium::{FilePremiumStore, PREMIUM_FILENAME, PremiumAccess};
pub use publisher::{
    FilePayloadStore, PAYLOAD_FILENAME, SharedPayload, SharedStation, build_payload,
    default_shared_dir, windowed_series,
};
pub use query::{ChartRange, StationItem, history_in_window, list_stations};
pub use reconcile::{HistoricalIndex, group_historical, index_latest, merge_stations};
pub use service::{ArsoService, DataStatus, HISTORICAL_TTL, Snapshot};
pub use thresholds::{Pm10Breakpoints, Pm25Breakpoints, Thresholds, classify};
pub use traits::{FeedSource, PayloadSink, PremiumAccessStore};
pub use xml::{parse_measurements, parse_stations};

// Re-export types for convenience
pub use zrak_types::{
    AirQualityLevel, ChartPoint, Measurement, ParseError, Pollutant, Station,
};
