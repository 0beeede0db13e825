//! Per-tick orchestration
//!
//! A tick polls one feed and then, for each new entry in feed order:
//! 1. Re-checks the dedup store
//! 2. Scrapes the link preview
//! 3. Downloads and transcodes the preview image, if any
//! 4. Publishes the post
//! 5. Records the URL in the dedup store
//!
//! Entries are processed one after another; the store is trimmed once after
//! the last one.

use crate::config::Config;
use crate::feed::{FeedEntry, FeedPoller};
use crate::pipeline::compose::compose_post;
use crate::preview::{ImageTranscoder, PreviewError, PreviewScraper};
use crate::publisher::{PostHandle, PublishError, Publisher};
use crate::storage::{SharedStorage, StorageError};
use crate::FeedError;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Posting knobs the pipeline needs from the configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub languages: Vec<String>,
    pub thumbnail_max_width: u32,
    pub retention: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            languages: config.posting.languages.clone(),
            thumbnail_max_width: config.posting.thumbnail_max_width,
            retention: config.storage.retention,
        }
    }
}

/// Counts of what happened to the entries of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries that passed the poller's filters
    pub candidates: usize,
    pub published: usize,
    /// In-batch duplicates and entries another feed posted first
    pub skipped: usize,
    pub failed: usize,
}

/// Why a single entry could not be published
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("preview unavailable: {0}")]
    Preview(#[from] PreviewError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("dedup store error: {0}")]
    Storage(#[from] StorageError),
}

/// Successful result of processing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Published(PostHandle),
    AlreadyPosted,
}

/// Shared, immutable machinery every feed task runs its ticks through
pub struct Pipeline {
    client: Client,
    store: SharedStorage,
    scraper: Arc<dyn PreviewScraper>,
    transcoder: Arc<dyn ImageTranscoder>,
    publisher: Arc<dyn Publisher>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Creates a new pipeline
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch feeds
    /// * `store` - Dedup store shared with every other feed
    /// * `scraper` - Link preview source
    /// * `transcoder` - Thumbnail encoder
    /// * `publisher` - Where posts go
    /// * `settings` - Languages, thumbnail width and retention
    pub fn new(
        client: Client,
        store: SharedStorage,
        scraper: Arc<dyn PreviewScraper>,
        transcoder: Arc<dyn ImageTranscoder>,
        publisher: Arc<dyn Publisher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            store,
            scraper,
            transcoder,
            publisher,
            settings,
        }
    }

    pub fn store(&self) -> &SharedStorage {
        &self.store
    }

    /// Runs one poll-and-publish cycle for a feed
    ///
    /// Per-entry failures are logged and counted; they never abort the tick
    /// and never write a dedup record.
    ///
    /// # Errors
    ///
    /// Fetch, parse and store-lookup failures of the poll itself. The
    /// poller's cursor is left untouched in that case.
    pub async fn run_tick(&self, poller: &mut FeedPoller) -> Result<TickReport, FeedError> {
        let feed = poller.index();
        tracing::debug!(feed, "Running as scheduled for {}", poller.feed_url());

        let entries = poller.fetch_valid_unposted(&self.client, &self.store).await?;
        if entries.is_empty() {
            tracing::debug!(feed, "Nothing to post");
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            candidates: entries.len(),
            ..TickReport::default()
        };
        let mut seen = HashSet::new();

        for entry in &entries {
            let Some(url) = entry.url() else {
                report.skipped += 1;
                continue;
            };

            if !seen.insert(url) {
                tracing::debug!(feed, "{}: Listed twice in this batch, skipping", url);
                report.skipped += 1;
                continue;
            }

            match self.process_entry(feed, entry, url).await {
                Ok(EntryOutcome::Published(_)) => report.published += 1,
                Ok(EntryOutcome::AlreadyPosted) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(feed, "{}: {}", url, e);
                    report.failed += 1;
                }
            }
        }

        self.store.trim(self.settings.retention);

        tracing::info!(
            feed,
            "Finished run: {} published, {} skipped, {} failed",
            report.published,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Enriches, publishes and records one entry
    async fn process_entry(
        &self,
        feed: usize,
        entry: &FeedEntry,
        url: &str,
    ) -> Result<EntryOutcome, EntryError> {
        // Another feed may have posted the same link since this poll
        if self.store.has(url)? {
            tracing::debug!(feed, "{}: Already posted, skipping", url);
            return Ok(EntryOutcome::AlreadyPosted);
        }

        tracing::debug!(feed, "{}: Starting post creation", url);
        let preview = self.scraper.fetch_preview(url).await?;

        let thumbnail = match &preview.image_url {
            Some(image_url) => self.thumbnail(feed, url, image_url).await,
            None => None,
        };

        let post = compose_post(entry, url, &preview, &self.settings.languages, thumbnail);
        let handle = self.publisher.post(post).await?;
        tracing::info!(feed, "{}: Successfully posted ({})", url, handle.uri);

        match self.store.add(url) {
            Ok(()) => {}
            Err(StorageError::DuplicateKey(_)) => {
                tracing::warn!(feed, "{}: Was recorded concurrently by another feed", url);
            }
            Err(e) => return Err(EntryError::Storage(e)),
        }

        Ok(EntryOutcome::Published(handle))
    }

    /// Downloads and transcodes the preview image; failures drop the thumbnail
    async fn thumbnail(&self, feed: usize, url: &str, image_url: &Url) -> Option<Vec<u8>> {
        tracing::debug!(feed, "{}: Downloading preview image {}", url, image_url);

        match self.transcode(image_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(feed, "{}: Posting without thumbnail: {}", url, e);
                None
            }
        }
    }

    async fn transcode(&self, image_url: &Url) -> Result<Vec<u8>, PreviewError> {
        let bytes = self.scraper.fetch_image(image_url).await?;
        let transcoder = Arc::clone(&self.transcoder);
        let max_width = self.settings.thumbnail_max_width;

        tokio::task::spawn_blocking(move || transcoder.resize_to_jpeg(&bytes, max_width))
            .await
            .map_err(|e| PreviewError::Task(e.to_string()))?
    }
}
