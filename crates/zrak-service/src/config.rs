//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use zrak_core::{FeedUrls, PAYLOAD_FILENAME, PREMIUM_FILENAME, default_shared_dir};

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed endpoints and request settings.
    pub feeds: FeedsConfig,
    /// Where shared documents are written.
    pub publish: PublishConfig,
    /// Background refresh settings.
    pub collector: CollectorConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// ```
    /// use zrak_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.feeds.validate());
        errors.extend(self.publish.validate());
        errors.extend(self.collector.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Feed endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Latest hourly measurements.
    pub latest_hourly: String,
    /// Daily station directory.
    pub station_directory: String,
    /// Seven days of hourly measurements.
    pub seven_day_hourly: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Minimum request timeout in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Maximum request timeout in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 300;

impl Default for FeedsConfig {
    fn default() -> Self {
        let urls = FeedUrls::default();
        Self {
            latest_hourly: urls.latest_hourly,
            station_directory: urls.station_directory,
            seven_day_hourly: urls.seven_day_hourly,
            timeout_secs: zrak_core::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl FeedsConfig {
    /// The configured endpoints.
    pub fn urls(&self) -> FeedUrls {
        FeedUrls {
            latest_hourly: self.latest_hourly.clone(),
            station_directory: self.station_directory.clone(),
            seven_day_hourly: self.seven_day_hourly.clone(),
        }
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate feed configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("feeds.latest_hourly", &self.latest_hourly),
            ("feeds.station_directory", &self.station_directory),
            ("feeds.seven_day_hourly", &self.seven_day_hourly),
        ] {
            if url.is_empty() {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "URL cannot be empty".to_string(),
                });
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("URL '{}' must start with http:// or https://", url),
                });
            }
        }

        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            errors.push(ValidationError {
                field: "feeds.timeout_secs".to_string(),
                message: format!(
                    "timeout {} is out of range ({}-{} seconds)",
                    self.timeout_secs, MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS
                ),
            });
        }

        errors
    }
}

/// Shared document locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Shared payload file.
    pub payload_path: PathBuf,
    /// Premium flag file.
    pub premium_path: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        let dir = default_shared_dir();
        Self {
            payload_path: dir.join(PAYLOAD_FILENAME),
            premium_path: dir.join(PREMIUM_FILENAME),
        }
    }
}

impl PublishConfig {
    /// Validate publish configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.payload_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "publish.payload_path".to_string(),
                message: "payload path cannot be empty".to_string(),
            });
        }
        if self.premium_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "publish.premium_path".to_string(),
                message: "premium path cannot be empty".to_string(),
            });
        }
        if !self.payload_path.as_os_str().is_empty() && self.payload_path == self.premium_path {
            errors.push(ValidationError {
                field: "publish.premium_path".to_string(),
                message: "premium path must differ from payload path".to_string(),
            });
        }

        errors
    }
}

/// Background refresh settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Seconds between forced refreshes.
    pub refresh_interval: u64,
}

/// Minimum refresh interval in seconds (1 minute).
pub const MIN_REFRESH_INTERVAL: u64 = 60;
/// Maximum refresh interval in seconds (1 day).
pub const MAX_REFRESH_INTERVAL: u64 = 86_400;

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 1800,
        }
    }
}

impl CollectorConfig {
    /// The refresh interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// Validate collector configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.refresh_interval < MIN_REFRESH_INTERVAL {
            errors.push(ValidationError {
                field: "collector.refresh_interval".to_string(),
                message: format!(
                    "refresh interval {} is too short (minimum {} seconds)",
                    self.refresh_interval, MIN_REFRESH_INTERVAL
                ),
            });
        } else if self.refresh_interval > MAX_REFRESH_INTERVAL {
            errors.push(ValidationError {
                field: "collector.refresh_interval".to_string(),
                message: format!(
                    "refresh interval {} is too long (maximum {} seconds / 1 day)",
                    self.refresh_interval, MAX_REFRESH_INTERVAL
                ),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `collector.refresh_interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path: `<config_dir>/zrak/service.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zrak")
        .join("service.toml")
}
