//! Link preview enrichment
//!
//! Everything needed to turn an entry's link into an embed card:
//! - Scraping Open Graph metadata from the linked page
//! - Downloading the preview image
//! - Transcoding it into a size-capped JPEG thumbnail

mod image;
mod scraper;

pub use self::image::{JpegTranscoder, MAX_THUMBNAIL_BYTES};
pub use self::scraper::{parse_preview, HtmlPreviewScraper, MAX_IMAGE_DOWNLOAD_BYTES};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors raised while enriching an entry
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Invalid link {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Image at {url} exceeds {limit} bytes")]
    DownloadTooLarge { url: String, limit: usize },

    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("Thumbnail is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Transcoding task failed: {0}")]
    Task(String),
}

/// Metadata scraped from a linked page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPreview {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Url>,
}

/// Fetches page metadata and preview images
#[async_trait]
pub trait PreviewScraper: Send + Sync {
    /// Scrapes title, description and image reference of a page
    async fn fetch_preview(&self, url: &str) -> Result<LinkPreview, PreviewError>;

    /// Downloads raw image bytes
    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, PreviewError>;
}

/// Converts arbitrary image bytes into a JPEG thumbnail
pub trait ImageTranscoder: Send + Sync {
    /// Downsizes to at most `max_width` pixels wide and encodes as JPEG
    fn resize_to_jpeg(&self, bytes: &[u8], max_width: u32) -> Result<Vec<u8>, PreviewError>;
}
