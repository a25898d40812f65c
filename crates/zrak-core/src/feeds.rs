//! ARSO feed endpoints and the HTTP feed source.
//!
//! Three documents are published by ARSO:
//!
//! | Feed | Content | Used for |
//! |------|---------|----------|
//! | [`Feed::LatestHourly`] | last hourly measurement per station | latest snapshot, secondary station list |
//! | [`Feed::StationDirectory`] | daily report with station metadata | primary station list |
//! | [`Feed::SevenDayHourly`] | every hourly measurement of the past week | historical series |
//!
//! # Example
//!
//! ```no_run
//! use zrak_core::{Feed, FeedSource, FeedUrls, HttpFeedSource};
//!
//! # async fn example() -> zrak_core::Result<()> {
//! let source = HttpFeedSource::new(FeedUrls::default())?;
//! let body = source.fetch(Feed::LatestHourly).await?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::FeedSource;

/// Latest hourly measurements.
pub const LATEST_HOURLY_URL: &str =
    "https://www.arso.gov.si/xml/zrak/ones_zrak_urni_podatki_zadnji.xml";
/// Daily report, used as the station directory.
pub const STATION_DIRECTORY_URL: &str =
    "https://www.arso.gov.si/xml/zrak/ones_zrak_dnevni_podatki_zadnji.xml";
/// Hourly measurements for the past seven days.
pub const SEVEN_DAY_HOURLY_URL: &str =
    "https://www.arso.gov.si/xml/zrak/ones_zrak_urni_podatki_7dni.xml";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One of the ARSO feed documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Latest hourly measurements.
    LatestHourly,
    /// Daily station directory.
    StationDirectory,
    /// Seven days of hourly measurements.
    SevenDayHourly,
}

impl Feed {
    /// All feeds.
    pub const ALL: [Feed; 3] = [Feed::LatestHourly, Feed::StationDirectory, Feed::SevenDayHourly];
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::LatestHourly => write!(f, "latest hourly"),
            Feed::StationDirectory => write!(f, "station directory"),
            Feed::SevenDayHourly => write!(f, "7-day hourly"),
        }
    }
}

/// Locations of the three feed documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedUrls {
    /// Latest hourly measurements.
    pub latest_hourly: String,
    /// Daily station directory.
    pub station_directory: String,
    /// Seven days of hourly measurements.
    pub seven_day_hourly: String,
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            latest_hourly: LATEST_HOURLY_URL.to_string(),
            station_directory: STATION_DIRECTORY_URL.to_string(),
            seven_day_hourly: SEVEN_DAY_HOURLY_URL.to_string(),
        }
    }
}

impl FeedUrls {
    /// URL of a single feed.
    pub fn url(&self, feed: Feed) -> &str {
        match feed {
            Feed::LatestHourly => &self.latest_hourly,
            Feed::StationDirectory => &self.station_directory,
            Feed::SevenDayHourly => &self.seven_day_hourly,
        }
    }

    /// Check that every URL uses http or https.
    pub fn validate(&self) -> Result<()> {
        for feed in Feed::ALL {
            let url = self.url(feed);
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::invalid_config(format!(
                    "{} URL must start with http:// or https://, got: {}",
                    feed, url
                )));
            }
        }
        Ok(())
    }
}

/// Feed source backed by HTTPS requests.
///
/// Every request bypasses intermediate caches and fails on a non-2xx status.
/// There are no retries; the caller's cache absorbs transient failures.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    urls: FeedUrls,
}

impl HttpFeedSource {
    /// Create a source with the default 20 second timeout.
    pub fn new(urls: FeedUrls) -> Result<Self> {
        Self::with_timeout(urls, DEFAULT_TIMEOUT)
    }

    /// Create a source with a custom per-request timeout.
    pub fn with_timeout(urls: FeedUrls, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("zrak/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::invalid_config(format!("HTTP client: {}", e)))?;

        Self::with_client(urls, client)
    }

    /// Create a source with a custom reqwest client.
    pub fn with_client(urls: FeedUrls, client: Client) -> Result<Self> {
        urls.validate()?;
        Ok(Self { client, urls })
    }

    /// The configured feed URLs.
    pub fn urls(&self) -> &FeedUrls {
        &self.urls
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed: Feed) -> Result<Vec<u8>> {
        let url = self.urls.url(feed);
        debug!("Fetching {} feed from {}", feed, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(url, status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| Error::Network {
            url: url.to_string(),
            source: e,
        })?;
        debug!("Fetched {} feed: {} bytes", feed, body.len());
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let urls = FeedUrls::default();
        assert!(urls.url(Feed::LatestHourly).ends_with("ones_zrak_urni_podatki_zadnji.xml"));
        assert!(urls.url(Feed::StationDirectory).ends_with("ones_zrak_dnevni_podatki_zadnji.xml"));
        assert!(urls.url(Feed::SevenDayHourly).ends_with("ones_zrak_urni_podatki_7dni.xml"));
        assert!(urls.validate().is_ok());
    }

    #[test]
    fn test_source_creation() {
        let source = HttpFeedSource::new(FeedUrls::default()).unwrap();
        assert_eq!(source.urls(), &FeedUrls::default());
    }

    #[test]
    fn test_source_rejects_invalid_url() {
        let urls = FeedUrls {
            station_directory: "ftp://example.com/feed.xml".to_string(),
            ..FeedUrls::default()
        };
        let err = HttpFeedSource::new(urls).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("station directory"));
    }

    #[test]
    fn test_feed_urls_deserialize_partial() {
        let urls: FeedUrls = serde_json::from_str(r#"{"latest_hourly":"http://localhost/x.xml"}"#).unwrap();
        assert_eq!(urls.latest_hourly, "http://localhost/x.xml");
        assert_eq!(urls.seven_day_hourly, SEVEN_DAY_HOURLY_URL);
    }

    #[test]
    fn test_feed_display() {
        assert_eq!(Feed::SevenDayHourly.to_string(), "7-day hourly");
    }
}
