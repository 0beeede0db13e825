//! Skyposter: a feed-to-Bluesky relay
//!
//! This crate polls syndication feeds on independent schedules, filters out
//! entries that are too old or were already published, enriches the rest with
//! link-preview metadata and publishes them, remembering every published URL
//! so restarts never repost.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod preview;
pub mod publisher;
pub mod storage;

use thiserror::Error;

/// Main error type for Skyposter operations
#[derive(Debug, Error)]
pub enum SkyposterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Publish error: {0}")]
    Publish(#[from] publisher::PublishError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while polling a single feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Feed {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse feed {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Dedup store unavailable: {0}")]
    Storage(#[from] storage::StorageError),
}

impl FeedError {
    /// True for failures reaching the feed (network or HTTP status)
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Status { .. })
    }
}

/// Result type alias for Skyposter operations
pub type Result<T> = std::result::Result<T, SkyposterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use feed::{FeedCursor, FeedEntry, FeedPoller};
pub use pipeline::{Pipeline, Scheduler, TickReport};
pub use storage::{DedupStore, SharedStorage, SqliteStorage};
