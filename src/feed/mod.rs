//! Feed module for polling syndication sources
//!
//! This module contains the ingestion side of the pipeline:
//! - HTTP fetching of raw feed documents
//! - Parsing RSS/Atom/JSON Feed into entries
//! - The per-feed recency cursor
//! - Filtering against the cursor and the dedup store

mod cursor;
mod fetcher;
mod parser;
mod poller;

pub use cursor::FeedCursor;
pub use fetcher::{build_http_client, fetch_feed_bytes, USER_AGENT};
pub use parser::{html_to_text, parse_feed, FeedEntry};
pub use poller::{filter_unposted, FeedPoller};
