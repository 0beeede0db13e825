//! Post composition
//!
//! Merges a feed entry with its scraped preview into [`PostData`].

use crate::feed::FeedEntry;
use crate::preview::LinkPreview;
use crate::publisher::{PostData, PostEmbed};
use chrono::Utc;

/// Maximum post length accepted by the network
pub const MAX_POST_CHARS: usize = 300;

const SEPARATOR: &str = " - ";
const ELLIPSIS: char = '…';

/// Builds the post for `entry`, linking to `url`
///
/// The feed's own title and summary win over scraped metadata; the entry's
/// publish time is kept as the post's creation time so backfilled posts are
/// backdated.
pub fn compose_post(
    entry: &FeedEntry,
    url: &str,
    preview: &LinkPreview,
    languages: &[String],
    thumbnail: Option<Vec<u8>>,
) -> PostData {
    let title = entry
        .title
        .as_deref()
        .or(preview.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let description = entry
        .description
        .as_deref()
        .or(preview.description.as_deref())
        .or(entry.content.as_deref())
        .unwrap_or_default();

    PostData {
        text: post_text(title, url),
        created_at: entry.published_at.unwrap_or_else(Utc::now),
        languages: languages.to_vec(),
        embed: Some(PostEmbed {
            uri: url.to_string(),
            title: title.unwrap_or(url).to_string(),
            description: description.to_string(),
            thumbnail,
        }),
    }
}

/// `"{title} - {url}"`, shortening the title to fit the length cap
fn post_text(title: Option<&str>, url: &str) -> String {
    let Some(title) = title else {
        return url.to_string();
    };

    let reserved = SEPARATOR.chars().count() + url.chars().count();
    let budget = MAX_POST_CHARS.saturating_sub(reserved);

    // Room for at least one character plus the ellipsis
    if budget < 2 {
        return url.to_string();
    }

    let title = if title.chars().count() > budget {
        let mut short: String = title.chars().take(budget - 1).collect();
        short.truncate(short.trim_end().len());
        short.push(ELLIPSIS);
        short
    } else {
        title.to_string()
    };

    format!("{}{}{}", title, SEPARATOR, url)
}
