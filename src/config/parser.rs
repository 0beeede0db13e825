use crate::config::types::{AccountConfig, Config, FeedsConfig, PostingConfig, StorageConfig};
use crate::config::validation::validate;
use crate::ConfigResult;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_SERVICE: &str = "https://bsky.social";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_BACKDATE_HOURS: u32 = 3;
pub const DEFAULT_DATABASE_PATH: &str = "./data/posts.sqlite3";
pub const DEFAULT_SESSION_PATH: &str = "./data/persist.json";
pub const DEFAULT_RETENTION: usize = 100;
pub const DEFAULT_THUMBNAIL_MAX_WIDTH: u32 = 800;

/// Settings of the `start` command
///
/// Every flag falls back to the environment variable named next to it, then
/// to its default. Call `dotenv` before parsing if a `.env` file should be
/// honoured.
///
/// # Example
///
/// ```
/// use clap::Parser;
/// use skyposter::config::StartArgs;
///
/// let config = StartArgs::try_parse_from([
///     "start",
///     "--app-identifier", "bot.example.com",
///     "--app-password", "app-password",
///     "--rss-feed-urls", "https://example.com/feed.xml",
/// ])
/// .unwrap()
/// .into_config()
/// .unwrap();
/// assert_eq!(config.feeds.urls.len(), 1);
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "start")]
pub struct StartArgs {
    /// Base URL of the PDS to post through
    #[arg(long, env = "APP_SERVICE", default_value = DEFAULT_SERVICE)]
    pub app_service: Url,

    /// Handle or email of the posting account
    #[arg(long, env = "APP_IDENTIFIER")]
    pub app_identifier: String,

    /// App password of the posting account
    #[arg(long, env = "APP_PASSWORD", hide_env_values = true)]
    pub app_password: String,

    /// Comma-separated list of feed URLs
    #[arg(long, env = "RSS_FEED_URLS", value_delimiter = ',', required = true)]
    pub rss_feed_urls: Vec<Url>,

    /// Minutes between two polls of the same feed
    #[arg(long, env = "RSS_CRON_INTERVAL_MINUTES", default_value_t = DEFAULT_INTERVAL_MINUTES)]
    pub rss_cron_interval_minutes: u64,

    /// How many hours back the first poll of each feed looks
    #[arg(long, env = "RSS_FEED_BACKDATE_HOURS", default_value_t = DEFAULT_BACKDATE_HOURS)]
    pub rss_feed_backdate_hours: u32,

    /// Comma-separated language tags attached to every post
    #[arg(long, env = "POSTING_LANGUAGES", value_delimiter = ',')]
    pub posting_languages: Vec<String>,

    /// Block replies on every created post
    #[arg(
        long,
        env = "DISABLE_POST_COMMENTS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub disable_post_comments: bool,

    /// Path of the posted-URL database
    #[arg(long, env = "DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,

    /// Path of the persisted publisher session
    #[arg(long, env = "SESSION_PATH", default_value = DEFAULT_SESSION_PATH)]
    pub session_path: PathBuf,

    /// Number of posted URLs kept after each trim
    #[arg(long, env = "DEDUP_RETENTION", default_value_t = DEFAULT_RETENTION)]
    pub dedup_retention: usize,

    /// Thumbnails are downsized to at most this many pixels wide
    #[arg(long, env = "THUMBNAIL_MAX_WIDTH", default_value_t = DEFAULT_THUMBNAIL_MAX_WIDTH)]
    pub thumbnail_max_width: u32,
}

impl StartArgs {
    /// Builds the sectioned configuration and validates it
    pub fn into_config(self) -> ConfigResult<Config> {
        let config = Config {
            account: AccountConfig {
                service: self.app_service,
                identifier: self.app_identifier.trim().to_string(),
                password: self.app_password,
            },
            feeds: FeedsConfig {
                urls: self.rss_feed_urls,
                interval_minutes: self.rss_cron_interval_minutes,
                backdate_hours: self.rss_feed_backdate_hours,
            },
            posting: PostingConfig {
                languages: self
                    .posting_languages
                    .iter()
                    .map(|tag| tag.trim())
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
                disable_comments: self.disable_post_comments,
                thumbnail_max_width: self.thumbnail_max_width,
            },
            storage: StorageConfig {
                database_path: self.database_path,
                session_path: self.session_path,
                retention: self.dedup_retention,
            },
        };

        validate(&config)?;

        Ok(config)
    }
}
