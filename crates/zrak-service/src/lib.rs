//! Background refresher and diagnostics for ARSO air-quality feeds.
//!
//! This crate provides a service that:
//! - Refreshes the latest station snapshot on a schedule
//! - Publishes the shared widget payload after every successful refresh
//! - Keeps serving the previous snapshot while the feeds are unreachable
//!
//! # Commands
//!
//! - `zrak-service run` - Refresh in the foreground until Ctrl-C (default)
//! - `zrak-service stations` - One-off station list with severity levels
//! - `zrak-service history <CODE>` - Chart points for one station
//! - `zrak-service payload` - Inspect the last published payload
//! - `zrak-service premium` - Read or set the premium flag
//! - `zrak-service config` - Print or initialize the configuration
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/zrak/service.toml`:
//!
//! ```toml
//! [feeds]
//! latest_hourly = "https://www.arso.gov.si/xml/zrak/ones_zrak_urni_podatki_zadnji.xml"
//! station_directory = "https://www.arso.gov.si/xml/zrak/ones_zrak_dnevni_podatki_zadnji.xml"
//! seven_day_hourly = "https://www.arso.gov.si/xml/zrak/ones_zrak_urni_podatki_7dni.xml"
//! timeout_secs = 20
//!
//! [publish]
//! payload_path = "~/.local/share/zrak/air_quality_widget_payload.json"
//! premium_path = "~/.local/share/zrak/premium_access.json"
//!
//! [collector]
//! refresh_interval = 1800
//! ```

pub mod collector;
pub mod config;

pub use collector::{Collector, CollectorError, collect_once};
pub use config::{
    CollectorConfig, Config, ConfigError, FeedsConfig, PublishConfig, ValidationError,
    default_config_path,
};
