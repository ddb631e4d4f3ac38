//! OpenAI and Azure OpenAI embedding providers.
//!
//! Both speak the same embeddings response format and differ only in URL
//! layout and authentication:
//!
//! | Provider | Endpoint | Auth |
//! |---|---|---|
//! | OpenAI | `{base}/v1/embeddings` | `Authorization: Bearer <key>` |
//! | Azure | `{endpoint}/openai/deployments/{deployment}/embeddings?api-version=..` | `api-key: <key>` |

use async_trait::async_trait;
use quarry_core::{AzureConfig, EmbedMode, Error, OpenAiConfig, Result};
use serde::Deserialize;

use crate::embedding::{EmbedResult, EmbeddingProvider};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Send an embeddings request and pull out the first vector.
async fn send_embedding_request(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<EmbedResult> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::provider_with_source(format!("Failed to call {provider} API"), e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(Error::provider(format!(
            "{provider} API error {status}: {error_text}"
        )));
    }

    let body: EmbeddingResponse = response.json().await.map_err(|e| {
        Error::provider_with_source(format!("Failed to parse {provider} response"), e)
    })?;

    let vector = body
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::provider(format!("Missing embedding in {provider} response")))?;

    log::debug!("{provider} returned a {}-dimensional embedding", vector.len());
    Ok(EmbedResult::Vector(vector))
}

// ============================================================================
// OpenAI
// ============================================================================

/// Embedding provider using the hosted OpenAI API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new OpenAI provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Embedding model (e.g., "text-embedding-ada-002")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a provider from the session's OpenAI settings.
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self::new(&config.api_key, &config.model).with_base_url(&config.base_url)
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, query: &str) -> Result<EmbedResult> {
        if self.api_key.is_empty() {
            return Err(Error::provider("OpenAI API key is not set"));
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": query,
        });

        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        send_embedding_request(request, "OpenAI").await
    }

    fn mode(&self) -> EmbedMode {
        EmbedMode::ClientVector
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Azure OpenAI
// ============================================================================

/// Embedding provider using an Azure OpenAI deployment.
pub struct AzureOpenAiProvider {
    api_key: String,
    endpoint: String,
    api_version: String,
    deployment: String,
    client: reqwest::Client,
}

impl AzureOpenAiProvider {
    /// Creates a provider from the session's Azure settings.
    pub fn from_config(config: &AzureConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            deployment: config.deployment.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn check_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("API key", &self.api_key),
            ("endpoint", &self.endpoint),
            ("API version", &self.api_version),
            ("deployment", &self.deployment),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::provider(format!(
                "Azure OpenAI settings missing: {}",
                missing.join(", ")
            )))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiProvider {
    async fn embed(&self, query: &str) -> Result<EmbedResult> {
        self.check_credentials()?;

        let url = format!(
            "{}/openai/deployments/{}/embeddings",
            self.endpoint, self.deployment
        );
        let request = self
            .client
            .post(url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&serde_json::json!({ "input": query }));

        send_embedding_request(request, "Azure OpenAI").await
    }

    fn mode(&self) -> EmbedMode {
        EmbedMode::ClientVector
    }

    fn name(&self) -> &str {
        "azure"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedding_body(vector: &[f32]) -> serde_json::Value {
        serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "model": "text-embedding-ada-002"
        })
    }

    #[tokio::test]
    async fn test_openai_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-ada-002",
                "input": "red shoes"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[0.1, 0.2, 0.3])))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            OpenAiProvider::new("sk-test", "text-embedding-ada-002").with_base_url(server.uri());
        let result = provider.embed("red shoes").await.unwrap();
        assert_eq!(result, EmbedResult::Vector(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn test_openai_missing_key_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("", "m").with_base_url(server.uri());
        let err = provider.embed("q").await.unwrap_err();
        assert!(err.is_provider());
    }

    #[tokio::test]
    async fn test_openai_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("bad", "m").with_base_url(server.uri());
        let err = provider.embed("q").await.unwrap_err();
        assert!(err.is_provider());
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_openai_empty_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("sk", "m").with_base_url(server.uri());
        let err = provider.embed("q").await.unwrap_err();
        assert!(err.to_string().contains("Missing embedding"));
    }

    #[tokio::test]
    async fn test_azure_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/embed-small/embeddings"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "az-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 0.0])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::from_config(&AzureConfig {
            api_key: "az-key".into(),
            endpoint: format!("{}/", server.uri()),
            api_version: "2024-02-01".into(),
            deployment: "embed-small".into(),
        });
        let result = provider.embed("query").await.unwrap();
        assert_eq!(result, EmbedResult::Vector(vec![1.0, 0.0]));
        assert_eq!(provider.name(), "azure");
    }

    #[tokio::test]
    async fn test_azure_missing_settings() {
        let provider = AzureOpenAiProvider::from_config(&AzureConfig {
            api_key: "k".into(),
            endpoint: String::new(),
            api_version: String::new(),
            deployment: "d".into(),
        });
        let err = provider.embed("q").await.unwrap_err();
        assert!(err.is_provider());
        assert!(err.to_string().contains("endpoint, API version"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_provider_error() {
        let provider = OpenAiProvider::new("sk", "m").with_base_url("http://127.0.0.1:1");
        let err = provider.embed("q").await.unwrap_err();
        assert!(err.is_provider());
    }
}
