//! Feed poller
//!
//! One [`FeedPoller`] per configured feed. It owns the feed's cursor and
//! decides which entries of a fresh fetch are new.

use crate::feed::cursor::FeedCursor;
use crate::feed::fetcher::fetch_feed_bytes;
use crate::feed::parser::{parse_feed, FeedEntry};
use crate::storage::{SharedStorage, StorageResult};
use crate::FeedError;
use chrono::{Duration, Utc};
use reqwest::Client;
use url::Url;

/// Polling state for one feed
#[derive(Debug, Clone)]
pub struct FeedPoller {
    index: usize,
    feed_url: Url,
    cursor: FeedCursor,
}

impl FeedPoller {
    /// Creates a poller whose first window reaches `backdate` into the past
    ///
    /// # Arguments
    ///
    /// * `index` - Ordinal of the feed in the configuration, for diagnostics
    /// * `feed_url` - Where the feed is fetched from
    /// * `backdate` - Size of the initial recency window
    pub fn new(index: usize, feed_url: Url, backdate: Duration) -> Self {
        let cursor = FeedCursor::new(Utc::now(), backdate);
        tracing::debug!(
            feed = index,
            "Initializing poller for {} with starting filter date of {}",
            feed_url,
            cursor.filter_date()
        );
        Self::with_cursor(index, feed_url, cursor)
    }

    /// Creates a poller with an explicit cursor
    pub fn with_cursor(index: usize, feed_url: Url, cursor: FeedCursor) -> Self {
        Self {
            index,
            feed_url,
            cursor,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    pub fn cursor(&self) -> &FeedCursor {
        &self.cursor
    }

    /// Fetches the feed and returns the entries that are recent and unposted
    ///
    /// The cursor only advances when fetching, parsing and the store lookups
    /// all succeed, so a failed poll is retried over the same window. It
    /// advances to the time the poll started, which keeps entries published
    /// while the request was in flight eligible for the next poll.
    ///
    /// Entries come back in feed order. Two entries sharing a link are both
    /// returned; only the dedup store is consulted.
    ///
    /// # Errors
    ///
    /// * [`FeedError::Fetch`] / [`FeedError::Status`] - the feed could not be retrieved
    /// * [`FeedError::Parse`] - the body is not a feed
    /// * [`FeedError::Storage`] - the dedup store could not be read
    pub async fn fetch_valid_unposted(
        &mut self,
        client: &Client,
        store: &SharedStorage,
    ) -> Result<Vec<FeedEntry>, FeedError> {
        let poll_started = Utc::now();

        let bytes = fetch_feed_bytes(client, &self.feed_url).await?;
        let entries = parse_feed(&bytes, self.feed_url.as_str())?;
        let total = entries.len();

        let fresh = filter_unposted(entries, &self.cursor, |url| store.has(url))?;

        self.cursor.advance_to(poll_started);
        tracing::debug!(
            feed = self.index,
            "{} of {} entries are new; filter date now {}",
            fresh.len(),
            total,
            self.cursor.filter_date()
        );

        Ok(fresh)
    }
}

/// Keeps entries newer than the cursor that have a link not yet posted
///
/// Entries without a publish time or without a link are dropped.
pub fn filter_unposted<F>(
    entries: Vec<FeedEntry>,
    cursor: &FeedCursor,
    mut is_posted: F,
) -> StorageResult<Vec<FeedEntry>>
where
    F: FnMut(&str) -> StorageResult<bool>,
{
    let mut fresh = Vec::new();

    for entry in entries {
        if !cursor.admits(entry.published_at) {
            continue;
        }

        let Some(url) = entry.url() else {
            continue;
        };

        if is_posted(url)? {
            continue;
        }

        fresh.push(entry);
    }

    Ok(fresh)
}
