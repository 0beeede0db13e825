//! HTTP fetcher implementation
//!
//! This module handles outbound HTTP for feeds:
//! - Building the shared HTTP client with a proper user agent
//! - GET requests for raw feed bytes
//! - Error classification into fetch failures

use crate::FeedError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// User agent sent with every outbound request
pub const USER_AGENT: &str = concat!("skyposter/", env!("CARGO_PKG_VERSION"));

/// Total timeout for a single request
const TOTAL_TIMEOUT_SECS: u64 = 30;

/// Timeout for establishing a connection
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds the HTTP client shared by feed, preview and image fetches
///
/// # Example
///
/// ```
/// use skyposter::feed::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the raw bytes of a feed
///
/// Network failures become [`FeedError::Fetch`], non-2xx answers
/// [`FeedError::Status`]. No retry happens here.
pub async fn fetch_feed_bytes(client: &Client, url: &Url) -> Result<Vec<u8>, FeedError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| FeedError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| FeedError::Fetch {
        url: url.to_string(),
        source,
    })?;

    Ok(body.to_vec())
}
