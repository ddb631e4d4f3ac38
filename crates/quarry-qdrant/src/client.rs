//! Qdrant REST client.
//!
//! Talks to the HTTP API directly so the compiled filter JSON goes on the
//! wire unchanged. Requests carry the `api-key` header when a key is set.
//! No timeout is configured; a hung server blocks the caller.

use async_trait::async_trait;
use quarry_core::{Error, QdrantConfig, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::store::VectorStore;
use crate::types::{Hit, SearchRequest};

/// Qdrant response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrolledPoint>,
}

#[derive(Debug, Deserialize)]
struct ScrolledPoint {
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<Hit>,
}

/// Client for one Qdrant server.
pub struct QdrantClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for QdrantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .finish_non_exhaustive()
    }
}

impl QdrantClient {
    /// Creates a client for `url`, authenticating with `api_key` if given.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let url = url.into();
        let base_url = url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::config("Qdrant URL is not set"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "Qdrant URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            client: reqwest::Client::new(),
        })
    }

    /// Creates a client from the session's Qdrant settings.
    pub fn from_config(config: &QdrantConfig) -> Result<Self> {
        Self::new(&config.url, Some(config.api_key.clone()))
    }

    /// The server URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::search_with_source(format!("Failed to {what}"), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::search(format!(
                "Qdrant error {status} while trying to {what}: {}",
                extract_error_message(&text)
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::search_with_source(format!("Failed to parse Qdrant response ({what})"), e)
        })?;
        Ok(envelope.result)
    }
}

/// Pull `status.error` out of a Qdrant error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["status"]["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let result: CollectionsResult = self
            .send(
                self.request(reqwest::Method::GET, "collections"),
                "list collections",
            )
            .await?;
        let mut names: Vec<String> = result.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        tracing::debug!(count = names.len(), "listed collections");
        Ok(names)
    }

    async fn peek_payload_keys(&self, collection: &str) -> Result<Vec<String>> {
        let body = json!({ "limit": 1, "with_payload": true, "with_vector": false });
        let result: ScrollResult = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("collections/{collection}/points/scroll"),
                )
                .json(&body),
                "peek a record",
            )
            .await?;

        // Payload maps keep server order; the first key seeds new rows.
        let keys: Vec<String> = result
            .points
            .into_iter()
            .next()
            .and_then(|p| p.payload)
            .map(|payload| payload.into_iter().map(|(k, _)| k).collect())
            .unwrap_or_default();

        if keys.is_empty() {
            tracing::warn!(collection, "no payload keys discovered; filters are unavailable");
        }
        Ok(keys)
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
        let path = format!("collections/{collection}/{}", request.endpoint());
        let builder = self
            .request(reqwest::Method::POST, &path)
            .json(&request.to_body());

        tracing::debug!(collection, endpoint = request.endpoint(), limit = request.limit, "searching");

        match request.mode() {
            quarry_core::EmbedMode::ClientVector => self.send(builder, "search").await,
            quarry_core::EmbedMode::ServerSide => {
                let result: QueryResult = self.send(builder, "search").await?;
                Ok(result.points)
            }
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

// ============================================================================
// Tests
// ============================================================================
