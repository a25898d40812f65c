//! In-memory feed source and payload sink for testing.
//!
//! [`MockFeedSource`] implements [`FeedSource`] without network access and
//! [`RecordingPayloadSink`] implements [`PayloadSink`] without touching the
//! filesystem, so the caching service can be exercised deterministically.
//!
//! # Features
//!
//! - **Per-feed bodies**: Serve any document for any feed
//! - **Failure injection**: Fail a feed permanently or for the next N requests
//! - **Latency simulation**: Delay responses (works with a paused tokio clock)
//! - **Request counting**: Assert how often each feed was hit

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::feeds::Feed;
use crate::publisher::SharedPayload;
use crate::traits::{FeedSource, PayloadSink};

/// Status reported by injected failures.
const MOCK_FAILURE_STATUS: u16 = 503;

#[derive(Default)]
struct FeedState {
    body: RwLock<Vec<u8>>,
    should_fail: AtomicBool,
    remaining_failures: AtomicU32,
    requests: AtomicU32,
}

/// A feed source serving in-memory documents.
///
/// # Example
///
/// ```
/// use zrak_core::{Feed, FeedSource, MockFeedSource};
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockFeedSource::new();
///     source.set_body(Feed::LatestHourly, "<arsopodatki/>").await;
///     let body = source.fetch(Feed::LatestHourly).await.unwrap();
///     assert_eq!(body, b"<arsopodatki/>");
///
///     source.set_should_fail(Feed::LatestHourly, true);
///     assert!(source.fetch(Feed::LatestHourly).await.is_err());
/// }
/// ```
pub struct MockFeedSource {
    feeds: HashMap<Feed, FeedState>,
    /// Simulated response latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockFeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("MockFeedSource");
        for feed in Feed::ALL {
            debug.field(&feed.to_string(), &self.request_count(feed));
        }
        debug.finish()
    }
}

impl Default for MockFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFeedSource {
    /// Create a source where every feed serves an empty document.
    pub fn new() -> Self {
        Self {
            feeds: Feed::ALL.iter().map(|feed| (*feed, FeedState::default())).collect(),
            latency_ms: AtomicU64::new(0),
        }
    }

    fn state(&self, feed: Feed) -> &FeedState {
        // Every feed is inserted in new()
        &self.feeds[&feed]
    }

    /// Replace the document served for a feed.
    pub async fn set_body(&self, feed: Feed, body: impl Into<Vec<u8>>) {
        *self.state(feed).body.write().await = body.into();
    }

    /// Make a feed fail on every request until cleared.
    pub fn set_should_fail(&self, feed: Feed, fail: bool) {
        self.state(feed).should_fail.store(fail, Ordering::Relaxed);
    }

    /// Make every feed fail (or recover).
    pub fn set_all_fail(&self, fail: bool) {
        for feed in Feed::ALL {
            self.set_should_fail(feed, fail);
        }
    }

    /// Fail the next `count` requests for a feed, then succeed.
    pub fn set_transient_failures(&self, feed: Feed, count: u32) {
        self.state(feed)
            .remaining_failures
            .store(count, Ordering::Relaxed);
    }

    /// Delay every response.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Requests made for a feed, including failed ones.
    pub fn request_count(&self, feed: Feed) -> u32 {
        self.state(feed).requests.load(Ordering::Relaxed)
    }

    /// Requests made across all feeds.
    pub fn total_requests(&self) -> u32 {
        Feed::ALL.iter().map(|feed| self.request_count(*feed)).sum()
    }

    /// Reset all request counters.
    pub fn reset_request_counts(&self) {
        for state in self.feeds.values() {
            state.requests.store(0, Ordering::Relaxed);
        }
    }

    fn check_should_fail(&self, feed: Feed) -> Result<()> {
        let state = self.state(feed);
        let transient = state
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();

        if transient || state.should_fail.load(Ordering::Relaxed) {
            Err(Error::http_status(format!("mock://{}", feed), MOCK_FAILURE_STATUS))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(&self, feed: Feed) -> Result<Vec<u8>> {
        self.state(feed).requests.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.check_should_fail(feed)?;
        Ok(self.state(feed).body.read().await.clone())
    }
}

/// A payload sink that keeps every published payload in memory.
#[derive(Debug, Default)]
pub struct RecordingPayloadSink {
    published: RwLock<Vec<SharedPayload>>,
    should_fail: AtomicBool,
}

impl RecordingPayloadSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make publishing fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// The most recently published payload.
    pub async fn last(&self) -> Option<SharedPayload> {
        self.published.read().await.last().cloned()
    }

    /// Number of successful publishes.
    pub async fn publish_count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait]
impl PayloadSink for RecordingPayloadSink {
    async fn publish(&self, payload: &SharedPayload) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "mock sink failure",
            )));
        }
        self.published.write().await.push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_serves_bodies_per_feed() {
        let source = MockFeedSource::new();
        source.set_body(Feed::StationDirectory, "directory").await;

        assert_eq!(source.fetch(Feed::StationDirectory).await.unwrap(), b"directory");
        assert!(source.fetch(Feed::SevenDayHourly).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts_requests() {
        let source = MockFeedSource::new();
        source.fetch(Feed::LatestHourly).await.unwrap();
        source.fetch(Feed::LatestHourly).await.unwrap();
        source.set_should_fail(Feed::SevenDayHourly, true);
        let _ = source.fetch(Feed::SevenDayHourly).await;

        assert_eq!(source.request_count(Feed::LatestHourly), 2);
        assert_eq!(source.request_count(Feed::SevenDayHourly), 1);
        assert_eq!(source.total_requests(), 3);

        source.reset_request_counts();
        assert_eq!(source.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let source = MockFeedSource::new();
        source.set_should_fail(Feed::LatestHourly, true);

        let err = source.fetch(Feed::LatestHourly).await.unwrap_err();
        assert!(err.is_network());
        assert!(source.fetch(Feed::StationDirectory).await.is_ok());

        source.set_should_fail(Feed::LatestHourly, false);
        assert!(source.fetch(Feed::LatestHourly).await.is_ok());

        source.set_all_fail(true);
        for feed in Feed::ALL {
            assert!(source.fetch(feed).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_transient_failures() {
        let source = MockFeedSource::new();
        source.set_transient_failures(Feed::SevenDayHourly, 2);

        assert!(source.fetch(Feed::SevenDayHourly).await.is_err());
        assert!(source.fetch(Feed::SevenDayHourly).await.is_err());
        assert!(source.fetch(Feed::SevenDayHourly).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let source = MockFeedSource::new();
        source.set_latency(Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        source.fetch(Feed::LatestHourly).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingPayloadSink::new();
        let payload = SharedPayload {
            generated_at: OffsetDateTime::UNIX_EPOCH,
            stations: Vec::new(),
        };

        sink.publish(&payload).await.unwrap();
        assert_eq!(sink.publish_count().await, 1);
        assert_eq!(sink.last().await, Some(payload.clone()));

        sink.set_should_fail(true);
        assert!(sink.publish(&payload).await.is_err());
        assert_eq!(sink.publish_count().await, 1);
    }
}
