//! Persisted agent configuration

use crate::publisher::PublishError;
use bsky_sdk::agent::config::{Config, FileStore};
use std::path::{Path, PathBuf};

/// Result of trying to pick up a persisted session at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The server accepted the persisted (possibly refreshed) session for
    /// this handle
    Resumed(String),
    /// A session was persisted but the server refused it
    Rejected(String),
    /// Nothing usable on disk
    NoSession,
}

/// File holding the agent configuration of the last run
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted configuration
    ///
    /// A missing, unreadable or malformed file all count as "nothing saved".
    pub async fn load(&self) -> Option<Config> {
        match Config::load(&FileStore::new(&self.path)).await {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!("No persisted session at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Writes the configuration, creating parent directories as needed
    pub async fn save(&self, config: &Config) -> Result<(), PublishError> {
        tracing::debug!("Writing persisted session to {}", self.path.display());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PublishError::Session(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        config
            .save(&FileStore::new(&self.path))
            .await
            .map_err(|e| PublishError::Session(format!("{}: {}", self.path.display(), e)))
    }
}
