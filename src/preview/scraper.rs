//! HTML metadata scraper
//!
//! Extracts from a page:
//! - Title (`og:title`, falling back to `<title>`)
//! - Description (`og:description`, falling back to `meta[name=description]`)
//! - Preview image (`og:image`, falling back to `twitter:image`)

use crate::preview::{LinkPreview, PreviewError, PreviewScraper};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Largest preview image downloaded before transcoding
pub const MAX_IMAGE_DOWNLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Scrapes previews over HTTP
#[derive(Debug, Clone)]
pub struct HtmlPreviewScraper {
    client: Client,
    image_limit: usize,
}

impl HtmlPreviewScraper {
    pub fn new(client: Client) -> Self {
        Self::with_image_limit(client, MAX_IMAGE_DOWNLOAD_BYTES)
    }

    /// Like [`HtmlPreviewScraper::new`], stopping image downloads past `image_limit` bytes
    pub fn with_image_limit(client: Client, image_limit: usize) -> Self {
        Self {
            client,
            image_limit,
        }
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, PreviewError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| PreviewError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl PreviewScraper for HtmlPreviewScraper {
    async fn fetch_preview(&self, url: &str) -> Result<LinkPreview, PreviewError> {
        let page_url = Url::parse(url).map_err(|e| PreviewError::InvalidUrl(format!("{}: {}", url, e)))?;

        let html = self
            .get(&page_url)
            .await?
            .text()
            .await
            .map_err(|source| PreviewError::Fetch {
                url: url.to_string(),
                source,
            })?;

        // Parsed synchronously so the document never lives across an await
        Ok(parse_preview(&html, &page_url))
    }

    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, PreviewError> {
        let too_large = || PreviewError::DownloadTooLarge {
            url: url.to_string(),
            limit: self.image_limit,
        };

        let mut response = self.get(url).await?;
        if response
            .content_length()
            .is_some_and(|len| len > self.image_limit as u64)
        {
            return Err(too_large());
        }

        // The declared length may be absent or wrong
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|source| PreviewError::Fetch {
            url: url.to_string(),
            source,
        })? {
            if bytes.len() + chunk.len() > self.image_limit {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }
}

/// Parses preview metadata out of an HTML document
///
/// Relative image references are resolved against `base_url`; anything that
/// does not resolve to http(s) is dropped.
///
/// # Example
///
/// ```
/// use skyposter::preview::parse_preview;
/// use url::Url;
///
/// let html = r#"<html><head><meta property="og:title" content="Hello"></head></html>"#;
/// let base_url = Url::parse("https://example.com/post").unwrap();
/// let preview = parse_preview(html, &base_url);
/// assert_eq!(preview.title, Some("Hello".to_string()));
/// ```
pub fn parse_preview(html: &str, base_url: &Url) -> LinkPreview {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| extract_title(&document));

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));

    let image_url = meta_content(&document, r#"meta[property="og:image"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="twitter:image"]"#))
        .and_then(|href| resolve_image(&href, base_url));

    LinkPreview {
        title,
        description,
        image_url,
    }
}

/// Reads the trimmed, non-empty `content` attribute of the first match
fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn resolve_image(href: &str, base_url: &Url) -> Option<Url> {
    let resolved = base_url.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}
