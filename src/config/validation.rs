use crate::config::types::{AccountConfig, Config, FeedsConfig, PostingConfig, StorageConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// One year of polling interval
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

/// Ten years of backdating
pub const MAX_BACKDATE_HOURS: u32 = 87_600;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_account_config(&config.account)?;
    validate_feeds_config(&config.feeds)?;
    validate_posting_config(&config.posting)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_account_config(config: &AccountConfig) -> Result<(), ConfigError> {
    validate_http_url("APP_SERVICE", &config.service)?;

    if config.identifier.trim().is_empty() {
        return Err(ConfigError::Validation(
            "identifier cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_feeds_config(config: &FeedsConfig) -> Result<(), ConfigError> {
    if config.urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one feed URL is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for url in &config.urls {
        validate_http_url("RSS_FEED_URLS", url)?;

        // Two pollers on one feed would each keep their own cursor
        if !seen.insert(url.as_str()) {
            return Err(ConfigError::Validation(format!(
                "feed URL '{}' is listed more than once",
                url
            )));
        }
    }

    if !(1..=MAX_INTERVAL_MINUTES).contains(&config.interval_minutes) {
        return Err(ConfigError::Validation(format!(
            "poll interval must be between 1 and {} minutes, got {}",
            MAX_INTERVAL_MINUTES, config.interval_minutes
        )));
    }

    if config.backdate_hours > MAX_BACKDATE_HOURS {
        return Err(ConfigError::Validation(format!(
            "backdate window must be at most {} hours, got {}",
            MAX_BACKDATE_HOURS, config.backdate_hours
        )));
    }

    Ok(())
}

fn validate_posting_config(config: &PostingConfig) -> Result<(), ConfigError> {
    for tag in &config.languages {
        validate_language_tag(tag)?;
    }

    if config.thumbnail_max_width < 1 {
        return Err(ConfigError::Validation(
            "thumbnail max width must be >= 1 pixel".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.session_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "session_path cannot be empty".to_string(),
        ));
    }

    if config.retention < 1 {
        return Err(ConfigError::Validation(
            "dedup retention must keep at least 1 URL".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(key: &str, url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ConfigError::InvalidUrl(format!(
                "{} entry '{}' must use http or https, got '{}'",
                key, url, scheme
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} entry '{}' has no host",
            key, url
        )));
    }

    Ok(())
}

/// Checks the rough shape of a BCP-47 tag: a 2-3 letter primary subtag,
/// then alphanumeric subtags of up to 8 characters
fn validate_language_tag(tag: &str) -> Result<(), ConfigError> {
    let mut subtags = tag.split('-');

    let primary_ok = subtags
        .next()
        .map(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);

    let rest_ok =
        subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()));

    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "'{}' is not a valid language tag",
            tag
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_config() -> Config {
        Config {
            account: AccountConfig {
                service: Url::parse("https://bsky.social").unwrap(),
                identifier: "bot.example.com".to_string(),
                password: "pw".to_string(),
            },
            feeds: FeedsConfig {
                urls: vec![Url::parse("https://example.com/feed.xml").unwrap()],
                interval_minutes: 5,
                backdate_hours: 3,
            },
            posting: PostingConfig {
                languages: vec!["en".to_string()],
                disable_comments: true,
                thumbnail_max_width: 800,
            },
            storage: StorageConfig {
                database_path: PathBuf::from("./data/posts.sqlite3"),
                session_path: PathBuf::from("./data/persist.json"),
                retention: 100,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = create_test_config();
        config.feeds.interval_minutes = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_interval_upper_bound() {
        let mut config = create_test_config();
        config.feeds.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(validate(&config).is_ok());

        config.feeds.interval_minutes = MAX_INTERVAL_MINUTES + 1;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.feeds.interval_minutes = u64::MAX;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_backdate_upper_bound() {
        let mut config = create_test_config();
        config.feeds.backdate_hours = MAX_BACKDATE_HOURS;
        assert!(validate(&config).is_ok());

        config.feeds.backdate_hours = MAX_BACKDATE_HOURS + 1;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.feeds.backdate_hours = u32::MAX;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_non_http_feed_rejected() {
        let mut config = create_test_config();
        config.feeds.urls = vec![Url::parse("ftp://example.com/feed.xml").unwrap()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_duplicate_feed_rejected() {
        let mut config = create_test_config();
        let url = Url::parse("https://example.com/feed.xml").unwrap();
        config.feeds.urls = vec![url.clone(), url];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let mut config = create_test_config();
        config.storage.retention = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_language_tags() {
        assert!(validate_language_tag("en").is_ok());
        assert!(validate_language_tag("pt-BR").is_ok());
        assert!(validate_language_tag("zh-Hant-TW").is_ok());

        assert!(validate_language_tag("").is_err());
        assert!(validate_language_tag("english").is_err());
        assert!(validate_language_tag("en_US").is_err());
        assert!(validate_language_tag("en-").is_err());
    }
}
