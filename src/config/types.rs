use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Main configuration structure for Skyposter
#[derive(Debug, Clone)]
pub struct Config {
    pub account: AccountConfig,
    pub feeds: FeedsConfig,
    pub posting: PostingConfig,
    pub storage: StorageConfig,
}

/// Credentials and endpoint of the publishing account
#[derive(Clone)]
pub struct AccountConfig {
    /// Base URL of the PDS to talk to
    pub service: Url,

    /// Handle or email used to log in
    pub identifier: String,

    /// App password
    pub password: String,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("service", &self.service.as_str())
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which feeds to poll and how often
#[derive(Debug, Clone)]
pub struct FeedsConfig {
    /// Feed URLs, polled independently of each other
    pub urls: Vec<Url>,

    /// Minutes between two ticks of the same feed
    pub interval_minutes: u64,

    /// How far back the first poll of every feed looks
    pub backdate_hours: u32,
}

impl FeedsConfig {
    /// Saturates instead of overflowing for unvalidated values
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Falls back to the largest representable window for unvalidated values
    pub fn backdate_window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(i64::from(self.backdate_hours))
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Shape of the published posts
#[derive(Debug, Clone)]
pub struct PostingConfig {
    /// Language tags attached to every post (may be empty)
    pub languages: Vec<String>,

    /// Whether replies get disabled on every created post
    pub disable_comments: bool,

    /// Thumbnails are downsized to at most this many pixels wide
    pub thumbnail_max_width: u32,
}

/// On-disk state locations and retention
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the SQLite dedup store
    pub database_path: PathBuf,

    /// Path to the persisted publisher session
    pub session_path: PathBuf,

    /// Number of posted URLs kept after each trim
    pub retention: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feeds(interval_minutes: u64, backdate_hours: u32) -> FeedsConfig {
        FeedsConfig {
            urls: Vec::new(),
            interval_minutes,
            backdate_hours,
        }
    }

    #[test]
    fn test_durations() {
        let config = feeds(5, 3);
        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(300));
        assert_eq!(config.backdate_window(), chrono::Duration::hours(3));
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let config = feeds(u64::MAX, u32::MAX);
        assert_eq!(
            config.poll_interval(),
            std::time::Duration::from_secs(u64::MAX)
        );
        assert_eq!(
            config.backdate_window(),
            chrono::Duration::hours(i64::from(u32::MAX))
        );
    }
}
