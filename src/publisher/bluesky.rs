//! Bluesky publisher built on [`BskyAgent`]
//!
//! The agent owns the session: it logs in, resumes, and refreshes an expired
//! access token on its own. This module adds persistence of that session,
//! link cards with uploaded thumbnails and the reply-blocking threadgate.

use crate::config::AccountConfig;
use crate::publisher::session::{ResumeOutcome, SessionStore};
use crate::publisher::{PostData, PostEmbed, PostHandle, PublishError, Publisher};
use async_trait::async_trait;
use bsky_sdk::agent::config::Config as AgentConfig;
use bsky_sdk::api::app::bsky::embed::external::{ExternalData, MainData};
use bsky_sdk::api::app::bsky::feed::post::{self, RecordEmbedRefs};
use bsky_sdk::api::app::bsky::feed::threadgate;
use bsky_sdk::api::com::atproto::repo::create_record;
use bsky_sdk::api::record::KnownRecord;
use bsky_sdk::api::types::string::{AtIdentifier, Datetime, Language};
use bsky_sdk::api::types::{TryIntoUnknown, Union};
use bsky_sdk::rich_text::RichText;
use bsky_sdk::BskyAgent;
use serde::Serialize;
use std::str::FromStr;

const THREADGATE_COLLECTION: &str = "app.bsky.feed.threadgate";

/// Publisher backed by a Bluesky PDS
pub struct BlueskyClient {
    agent: BskyAgent,
    account: AccountConfig,
    store: SessionStore,
    disable_comments: bool,
}

/// Record key of an `at://did/collection/rkey` URI
fn record_key(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().filter(|rkey| !rkey.is_empty())
}

/// Service URL as the agent expects it, without a trailing slash
fn endpoint(account: &AccountConfig) -> String {
    account.service.as_str().trim_end_matches('/').to_string()
}

/// String form of a CID as it appears on the wire
fn cid_string(cid: &impl Serialize) -> String {
    serde_json::to_value(cid)
        .ok()
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_default()
}

impl BlueskyClient {
    /// Creates an unauthenticated client; call [`BlueskyClient::login`] next
    ///
    /// # Arguments
    ///
    /// * `account` - Service URL and credentials
    /// * `store` - Where the agent configuration is persisted between runs
    /// * `disable_comments` - Attach a reply-blocking threadgate to each post
    pub async fn new(
        account: AccountConfig,
        store: SessionStore,
        disable_comments: bool,
    ) -> Result<Self, PublishError> {
        tracing::debug!("Initializing with service URL {}", account.service);

        let agent = BskyAgent::builder()
            .config(AgentConfig {
                endpoint: endpoint(&account),
                ..Default::default()
            })
            .build()
            .await
            .map_err(|e| PublishError::Session(e.to_string()))?;

        Ok(Self {
            agent,
            account,
            store,
            disable_comments,
        })
    }

    /// Authenticates, preferring the persisted session over a fresh login
    ///
    /// Returns the handle of the logged-in account.
    pub async fn login(&self) -> Result<String, PublishError> {
        let handle = match self.resume().await {
            ResumeOutcome::Resumed(handle) => {
                tracing::info!("Successful session resume for {}", handle);
                handle
            }
            ResumeOutcome::Rejected(reason) => {
                tracing::warn!(
                    "Persisted session rejected ({}); logging in with credentials",
                    reason
                );
                self.create_session().await?
            }
            ResumeOutcome::NoSession => {
                tracing::info!("No persisted session; logging in with credentials");
                self.create_session().await?
            }
        };

        self.persist().await?;
        Ok(handle)
    }

    /// Tries the session persisted by an earlier run
    ///
    /// The agent refreshes an expired access token while resuming, so only a
    /// session the server refuses outright is reported as rejected.
    pub async fn resume(&self) -> ResumeOutcome {
        let Some(session) = self.store.load().await.and_then(|config| config.session) else {
            return ResumeOutcome::NoSession;
        };

        if let Err(e) = self.agent.resume_session(session).await {
            return ResumeOutcome::Rejected(e.to_string());
        }

        match self.agent.get_session().await {
            Some(session) => ResumeOutcome::Resumed(session.handle.as_str().to_string()),
            None => ResumeOutcome::Rejected("session dropped after resume".to_string()),
        }
    }

    async fn create_session(&self) -> Result<String, PublishError> {
        tracing::debug!("Creating session for {}", self.account.identifier);

        let session = self
            .agent
            .login(&self.account.identifier, &self.account.password)
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))?;

        tracing::info!("Logged in as {}", session.handle.as_str());
        Ok(session.handle.as_str().to_string())
    }

    /// Writes the agent's current configuration, including its session
    async fn persist(&self) -> Result<(), PublishError> {
        self.store.save(&self.agent.to_config().await).await
    }

    async fn current_did(&self) -> Result<AtIdentifier, PublishError> {
        match self.agent.get_session().await {
            Some(session) => Ok(AtIdentifier::Did(session.did.clone())),
            None => Err(PublishError::Auth("not logged in".to_string())),
        }
    }

    async fn external_embed(
        &self,
        embed: PostEmbed,
    ) -> Result<Union<RecordEmbedRefs>, PublishError> {
        let thumb = match embed.thumbnail {
            Some(bytes) => {
                tracing::debug!("Uploading blob data for '{}'", embed.uri);
                let output = self
                    .agent
                    .api
                    .com
                    .atproto
                    .repo
                    .upload_blob(bytes)
                    .await
                    .map_err(|e| PublishError::Upload(e.to_string()))?;
                Some(output.data.blob)
            }
            None => None,
        };

        Ok(Union::Refs(RecordEmbedRefs::AppBskyEmbedExternalMain(
            Box::new(
                MainData {
                    external: ExternalData {
                        description: embed.description,
                        title: embed.title,
                        uri: embed.uri,
                        thumb,
                    }
                    .into(),
                }
                .into(),
            ),
        )))
    }

    /// Creates a threadgate with an empty allow list under the post's rkey
    async fn disable_replies(&self, post_uri: &str) -> Result<(), PublishError> {
        let rkey = record_key(post_uri)
            .ok_or_else(|| PublishError::Publish(format!("no record key in {}", post_uri)))?;

        let record = KnownRecord::from(threadgate::RecordData {
            allow: Some(Vec::new()),
            created_at: Datetime::now(),
            hidden_replies: None,
            post: post_uri.to_string(),
        })
        .try_into_unknown()
        .map_err(|e| PublishError::Publish(e.to_string()))?;

        self.agent
            .api
            .com
            .atproto
            .repo
            .create_record(
                create_record::InputData {
                    collection: THREADGATE_COLLECTION
                        .parse()
                        .map_err(|e| PublishError::Publish(format!("{}", e)))?,
                    record,
                    repo: self.current_did().await?,
                    rkey: Some(
                        rkey.parse()
                            .map_err(|e| PublishError::Publish(format!("rkey {}: {}", rkey, e)))?,
                    ),
                    swap_commit: None,
                    validate: None,
                }
                .into(),
            )
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Publisher for BlueskyClient {
    async fn post(&self, post: PostData) -> Result<PostHandle, PublishError> {
        self.current_did().await?;
        tracing::info!("Constructing post data for: '{}'", post.text);

        let rt = RichText::new_with_detect_facets(&post.text)
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        let embed = match post.embed {
            Some(embed) => Some(self.external_embed(embed).await?),
            None => None,
        };

        let langs = post
            .languages
            .iter()
            .map(|tag| {
                Language::from_str(tag)
                    .map_err(|e| PublishError::Publish(format!("language {}: {}", tag, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let created_at = Datetime::from_str(&post.created_at.fixed_offset().to_rfc3339())
            .map_err(|e| PublishError::Publish(format!("{}", e)))?;

        tracing::info!("Creating post record for: '{}'", post.text);
        let record = self
            .agent
            .create_record(post::RecordData {
                created_at,
                embed,
                entities: None,
                facets: rt.facets,
                labels: None,
                langs: (!langs.is_empty()).then_some(langs),
                reply: None,
                tags: None,
                text: post.text,
            })
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        let handle = PostHandle {
            uri: record.uri.clone(),
            cid: cid_string(&record.cid),
        };

        if self.disable_comments {
            tracing::info!("Disabling post comments via threadgate for '{}'", handle.uri);
            if let Err(e) = self.disable_replies(&handle.uri).await {
                tracing::warn!("Failed to create threadgate for {}: {}", handle.uri, e);
            }
        }

        // The agent may have refreshed its tokens during the calls above
        if let Err(e) = self.persist().await {
            tracing::warn!("Failed to persist session: {}", e);
        }

        Ok(handle)
    }
}
