//! Pipeline module tying feeds, enrichment and publishing together
//!
//! This module contains:
//! - Post composition from an entry and its preview
//! - The per-tick orchestrator
//! - The scheduler running one timer per feed
//! - [`relay`], wiring all of it to the real services

mod compose;
mod orchestrator;
mod scheduler;

pub use compose::{compose_post, MAX_POST_CHARS};
pub use orchestrator::{EntryError, EntryOutcome, Pipeline, PipelineSettings, TickReport};
pub use scheduler::Scheduler;

use crate::config::{validate, Config};
use crate::feed::build_http_client;
use crate::preview::{HtmlPreviewScraper, JpegTranscoder};
use crate::publisher::{BlueskyClient, SessionStore};
use crate::storage::{open_storage, SharedStorage};
use std::sync::Arc;
use tokio::sync::watch;

/// Runs the relay until `shutdown` flips to `true`
///
/// Opens the dedup store, authenticates the publisher and then polls every
/// configured feed on its own timer.
///
/// # Arguments
///
/// * `config` - Validated again here, since its fields are public
/// * `shutdown` - Observed between ticks
///
/// # Returns
///
/// * `Ok(())` - Every feed job stopped after shutdown
/// * `Err(SkyposterError)` - Startup failed before any feed was polled
pub async fn relay(config: Config, shutdown: watch::Receiver<bool>) -> crate::Result<()> {
    validate(&config)?;

    let store = SharedStorage::new(open_storage(&config.storage.database_path)?);
    let client = build_http_client()?;

    let bsky = BlueskyClient::new(
        config.account.clone(),
        SessionStore::new(&config.storage.session_path),
        config.posting.disable_comments,
    )
    .await?;
    bsky.login().await?;

    let pipeline = Arc::new(Pipeline::new(
        client.clone(),
        store,
        Arc::new(HtmlPreviewScraper::new(client)),
        Arc::new(JpegTranscoder::new()),
        Arc::new(bsky),
        PipelineSettings::from_config(&config),
    ));

    let scheduler = Scheduler::from_config(pipeline, &config.feeds);
    tracing::info!(
        "Polling {} feeds every {} minutes",
        scheduler.feed_count(),
        config.feeds.interval_minutes
    );

    scheduler.run(shutdown).await;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccountConfig, FeedsConfig, PostingConfig, StorageConfig};
    use crate::SkyposterError;
    use tempfile::TempDir;
    use url::Url;

    #[tokio::test]
    async fn test_relay_rejects_invalid_configuration_before_startup() {
        let dir = TempDir::new().unwrap();
        let database_path = dir.path().join("posts.sqlite3");
        let config = Config {
            account: AccountConfig {
                service: Url::parse("https://bsky.social").unwrap(),
                identifier: "bot.example.com".to_string(),
                password: "pw".to_string(),
            },
            feeds: FeedsConfig {
                urls: Vec::new(),
                interval_minutes: 5,
                backdate_hours: 3,
            },
            posting: PostingConfig {
                languages: Vec::new(),
                disable_comments: true,
                thumbnail_max_width: 800,
            },
            storage: StorageConfig {
                database_path: database_path.clone(),
                session_path: dir.path().join("persist.json"),
                retention: 100,
            },
        };
        let (_tx, rx) = watch::channel(false);

        let result = relay(config, rx).await;

        assert!(matches!(result, Err(SkyposterError::Config(_))));
        assert!(!database_path.exists());
    }
}
