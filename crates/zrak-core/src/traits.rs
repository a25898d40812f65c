//! Trait abstractions at the service's I/O seams.
//!
//! [`FeedSource`] abstracts over the live ARSO endpoints and in-memory mock
//! feeds, [`PayloadSink`] over where the shared payload is published, and
//! [`PremiumAccessStore`] over the persisted entitlement flag.

use async_trait::async_trait;

use crate::error::Result;
use crate::feeds::Feed;
use crate::publisher::SharedPayload;

/// Source of raw feed documents.
///
/// # Example
///
/// ```ignore
/// use zrak_core::{Feed, FeedSource, Result};
///
/// async fn feed_size<S: FeedSource>(source: &S) -> Result<usize> {
///     Ok(source.fetch(Feed::StationDirectory).await?.len())
/// }
/// ```
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the raw bytes of one feed.
    async fn fetch(&self, feed: Feed) -> Result<Vec<u8>>;
}

/// Destination for the shared payload.
#[async_trait]
pub trait PayloadSink: Send + Sync {
    /// Publish a freshly built payload, replacing the previous one.
    async fn publish(&self, payload: &SharedPayload) -> Result<()>;
}

/// Persisted premium-access flag.
pub trait PremiumAccessStore: Send + Sync {
    /// Whether premium access is unlocked. Unknown state reads as `false`.
    fn read(&self) -> bool;

    /// Persist the flag.
    fn write(&self, unlocked: bool) -> Result<()>;
}
