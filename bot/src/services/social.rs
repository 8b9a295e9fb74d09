//! Social platform access. The engine talks to the [`SocialClient`]
//! contract; [`BskyClient`] is the production implementation speaking
//! AT Protocol XRPC against a Bluesky PDS.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::config::SocialSettings;
use crate::models::{PostRef, Reply};

/// Image attachment ready for publication (already resized, censored
/// and encoded).
#[derive(Debug, Clone)]
pub struct PostImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub alt_text: String,
}

/// Abstract social platform used by the round engine.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Publishes a post and returns the platform reference for it.
    async fn publish(&self, text: &str, images: &[PostImage]) -> Result<PostRef>;

    /// All direct replies to a post, in the order the platform returns
    /// them. One-shot: calling again re-queries the platform.
    async fn fetch_replies(&self, post: &PostRef) -> Result<Vec<Reply>>;

    /// Acknowledges a correct reply with a like. Safe to call more than
    /// once for the same reply.
    async fn acknowledge(&self, reply: &Reply) -> Result<()>;

    /// Removes a previously published post.
    async fn remove_post(&self, post: &PostRef) -> Result<()>;
}

pub struct BskyClient {
    http: reqwest::Client,
    service: String,
    did: String,
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    blob: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    uri: String,
    cid: String,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    thread: ThreadView,
}

#[derive(Debug, Deserialize)]
struct ThreadView {
    #[serde(default)]
    post: Option<PostView>,
    #[serde(default)]
    replies: Vec<ThreadView>,
}

#[derive(Debug, Deserialize)]
struct PostView {
    uri: String,
    cid: String,
    author: AuthorView,
    record: PostRecord,
}

#[derive(Debug, Deserialize)]
struct AuthorView {
    handle: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostRecord {
    text: String,
}

impl BskyClient {
    /// Authenticates against the configured PDS and holds the session
    /// for the process lifetime. An expired session later surfaces as a
    /// collaborator failure and the affected round is abandoned.
    pub async fn login(settings: &SocialSettings) -> Result<Self> {
        let http = reqwest::Client::new();

        let session: SessionResponse = http
            .post(format!("{}/xrpc/com.atproto.server.createSession", settings.service))
            .json(&json!({
                "identifier": settings.identifier,
                "password": settings.password,
            }))
            .send()
            .await
            .context("Failed to reach PDS for session creation")?
            .error_for_status()
            .context("Session creation rejected")?
            .json()
            .await
            .context("Malformed session response")?;

        tracing::info!("Authenticated with {} as {}", settings.service, session.handle);

        Ok(Self {
            http,
            service: settings.service.clone(),
            did: session.did,
            access_jwt: session.access_jwt,
        })
    }

    async fn upload_blob(&self, image: &PostImage) -> Result<serde_json::Value> {
        let response: BlobResponse = self
            .http
            .post(format!("{}/xrpc/com.atproto.repo.uploadBlob", self.service))
            .bearer_auth(&self.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, image.mime_type.clone())
            .body(image.bytes.clone())
            .send()
            .await
            .context("Failed to upload image blob")?
            .error_for_status()
            .context("Image blob upload rejected")?
            .json()
            .await
            .context("Malformed blob upload response")?;
        Ok(response.blob)
    }

    async fn create_record(&self, collection: &str, record: serde_json::Value) -> Result<PostRef> {
        let response: RecordResponse = self
            .http
            .post(format!("{}/xrpc/com.atproto.repo.createRecord", self.service))
            .bearer_auth(&self.access_jwt)
            .json(&json!({
                "repo": self.did,
                "collection": collection,
                "record": record,
            }))
            .send()
            .await
            .with_context(|| format!("Failed to create {collection} record"))?
            .error_for_status()
            .with_context(|| format!("{collection} record rejected"))?
            .json()
            .await
            .context("Malformed record response")?;

        Ok(PostRef { uri: response.uri, cid: response.cid })
    }

    /// Record key is the last path segment of an AT URI.
    fn rkey(uri: &str) -> Result<&str> {
        uri.rsplit('/')
            .next()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("AT URI without record key: {uri}"))
    }

    fn now_timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[async_trait]
impl SocialClient for BskyClient {
    async fn publish(&self, text: &str, images: &[PostImage]) -> Result<PostRef> {
        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": text,
            "createdAt": Self::now_timestamp(),
        });

        if !images.is_empty() {
            let mut embedded = Vec::with_capacity(images.len());
            for image in images {
                let blob = self.upload_blob(image).await?;
                embedded.push(json!({ "image": blob, "alt": image.alt_text }));
            }
            record["embed"] = json!({
                "$type": "app.bsky.embed.images",
                "images": embedded,
            });
        }

        self.create_record("app.bsky.feed.post", record).await
    }

    async fn fetch_replies(&self, post: &PostRef) -> Result<Vec<Reply>> {
        let response: ThreadResponse = self
            .http
            .get(format!("{}/xrpc/app.bsky.feed.getPostThread", self.service))
            .bearer_auth(&self.access_jwt)
            .query(&[("uri", post.uri.as_str()), ("depth", "1")])
            .send()
            .await
            .context("Failed to fetch post thread")?
            .error_for_status()
            .context("Post thread request rejected")?
            .json()
            .await
            .context("Malformed post thread response")?;

        let replies = response
            .thread
            .replies
            .into_iter()
            .filter_map(|view| view.post)
            .enumerate()
            .map(|(i, view)| Reply {
                author: view.author.handle,
                text: view.record.text,
                position: i as u32 + 1,
                post: PostRef { uri: view.uri, cid: view.cid },
            })
            .collect();

        Ok(replies)
    }

    async fn acknowledge(&self, reply: &Reply) -> Result<()> {
        let record = json!({
            "$type": "app.bsky.feed.like",
            "subject": { "uri": reply.post.uri, "cid": reply.post.cid },
            "createdAt": Self::now_timestamp(),
        });
        self.create_record("app.bsky.feed.like", record).await?;
        Ok(())
    }

    async fn remove_post(&self, post: &PostRef) -> Result<()> {
        let rkey = Self::rkey(&post.uri)?;
        self.http
            .post(format!("{}/xrpc/com.atproto.repo.deleteRecord", self.service))
            .bearer_auth(&self.access_jwt)
            .json(&json!({
                "repo": self.did,
                "collection": "app.bsky.feed.post",
                "rkey": rkey,
            }))
            .send()
            .await
            .context("Failed to delete post record")?
            .error_for_status()
            .context("Post deletion rejected")?;
        Ok(())
    }
}
