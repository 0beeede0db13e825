use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a publisher
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Blob upload failed: {0}")]
    Upload(String),

    #[error("Post creation failed: {0}")]
    Publish(String),

    #[error("Session error: {0}")]
    Session(String),
}

/// Content of one post, ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct PostData {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub languages: Vec<String>,
    pub embed: Option<PostEmbed>,
}

/// External link card attached to a post
#[derive(Debug, Clone, PartialEq)]
pub struct PostEmbed {
    pub uri: String,
    pub title: String,
    pub description: String,
    /// JPEG bytes, already size-capped
    pub thumbnail: Option<Vec<u8>>,
}

/// Reference to a created post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub uri: String,
    pub cid: String,
}

/// Something that can publish posts
///
/// Implementations are shared across feed tasks, so they must be
/// `Send + Sync`.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes a post
    ///
    /// Follow-up side records (such as reply restrictions) are best-effort:
    /// their failure must not turn a created post into an error.
    async fn post(&self, post: PostData) -> Result<PostHandle, PublishError>;
}
