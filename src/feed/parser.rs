//! Feed parser
//!
//! Turns raw RSS, Atom or JSON Feed bytes into [`FeedEntry`] values.

use crate::FeedError;
use chrono::{DateTime, Utc};
use scraper::Html;

/// One entry from a feed, alive for a single poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// Provider-assigned identifier (guid/id)
    pub id: String,

    /// Entry title, if the feed provides one
    pub title: Option<String>,

    /// Summary with markup stripped
    pub description: Option<String>,

    /// Full content with markup stripped
    pub content: Option<String>,

    /// Original publish time; `updated` is deliberately not consulted
    pub published_at: Option<DateTime<Utc>>,

    /// First link of the entry
    pub primary_link: Option<String>,
}

impl FeedEntry {
    /// The URL this entry is published and deduplicated under
    pub fn url(&self) -> Option<&str> {
        self.primary_link.as_deref()
    }
}

/// Parses feed bytes, keeping entries in the order the provider lists them
///
/// # Arguments
///
/// * `bytes` - Raw feed document
/// * `source` - Feed URL, used in error messages
pub fn parse_feed(bytes: &[u8], source: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedError::Parse {
        url: source.to_string(),
        message: e.to_string(),
    })?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            id: entry.id,
            title: entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty()),
            description: entry
                .summary
                .map(|t| html_to_text(&t.content))
                .filter(|t| !t.is_empty()),
            content: entry
                .content
                .and_then(|c| c.body)
                .map(|body| html_to_text(&body))
                .filter(|t| !t.is_empty()),
            published_at: entry.published,
            primary_link: entry
                .links
                .into_iter()
                .next()
                .map(|l| l.href.trim().to_string())
                .filter(|href| !href.is_empty()),
        })
        .collect();

    Ok(entries)
}

/// Extracts the text of an HTML fragment, collapsing whitespace
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
