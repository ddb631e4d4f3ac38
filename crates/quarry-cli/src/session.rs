//! Interactive session state.
//!
//! A [`Session`] is the single owner of everything the search form edits:
//! configuration, selected collection, the filter builder, query text,
//! limit and score threshold. Handlers take it by `&mut`.
//!
//! The embedding provider and Qdrant client are built on first use and
//! dropped whenever a setting they depend on changes.

use std::sync::Arc;

use quarry_core::{EmbedMode, Error, ProviderKind, QuarryConfig, Result};
use quarry_embed::create_provider;
use quarry_filter::FilterBuilder;
use quarry_qdrant::{Hit, QdrantClient, QueryExecutor, VectorStore};

/// Settings editable with `set <field> <value>`.
pub const SETTABLE_FIELDS: &[&str] = &[
    "qdrant.url",
    "qdrant.api_key",
    "openai.api_key",
    "openai.model",
    "azure.api_key",
    "azure.endpoint",
    "azure.api_version",
    "azure.deployment",
    "fastembed.model",
];

/// One interactive search session.
pub struct Session {
    config: QuarryConfig,
    collection: Option<String>,
    filters: FilterBuilder,
    query: String,
    limit: u64,
    score_threshold: Option<f32>,
    executor: Option<QueryExecutor>,
}

impl Session {
    /// Start a session from loaded configuration.
    pub fn new(config: QuarryConfig) -> Self {
        let limit = clamp_limit(config.search.default_limit, config.search.max_limit);
        Self {
            config,
            collection: None,
            filters: FilterBuilder::default(),
            query: String::new(),
            limit,
            score_threshold: None,
            executor: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Selected collection.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The filter builder.
    pub fn filters(&self) -> &FilterBuilder {
        &self.filters
    }

    /// The filter builder, for editing rows.
    pub fn filters_mut(&mut self) -> &mut FilterBuilder {
        &mut self.filters
    }

    /// Query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Result limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Score threshold, if any.
    pub fn score_threshold(&self) -> Option<f32> {
        self.score_threshold
    }

    /// Embedding mode of the selected provider.
    pub fn mode(&self) -> EmbedMode {
        self.config.provider.mode()
    }

    // ------------------------------------------------------------------------
    // Form fields
    // ------------------------------------------------------------------------

    /// Set the query text.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Set the limit, clamped to `[1, max_limit]`. Returns the stored value.
    pub fn set_limit(&mut self, limit: u64) -> u64 {
        self.limit = clamp_limit(limit, self.config.search.max_limit);
        self.limit
    }

    /// Set or clear the score threshold.
    pub fn set_score_threshold(&mut self, threshold: Option<f32>) -> Result<()> {
        if let Some(t) = threshold {
            if !t.is_finite() {
                return Err(Error::validation(format!("Invalid score threshold: {t}")));
            }
        }
        self.score_threshold = threshold;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Select the embedding provider.
    pub fn set_provider(&mut self, provider: ProviderKind) {
        if self.config.provider != provider {
            self.config.provider = provider;
            self.invalidate_clients();
        }
    }

    /// Turn the environment-variable defaults on or off.
    ///
    /// Turning them on resets the variable-backed settings from `lookup`,
    /// clearing any whose variable is unset. Turning them off keeps the
    /// current values for manual editing.
    pub fn set_env_defaults<F>(&mut self, enabled: bool, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if enabled {
            self.config.reset_from_env(lookup);
        } else {
            self.config.using_env_defaults = false;
        }
        self.invalidate_clients();
    }

    /// Set one credential or endpoint by dotted name.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        let slot = match field {
            "qdrant.url" => &mut self.config.qdrant.url,
            "qdrant.api_key" => &mut self.config.qdrant.api_key,
            "openai.api_key" => &mut self.config.openai.api_key,
            "openai.model" => &mut self.config.openai.model,
            "azure.api_key" => &mut self.config.azure.api_key,
            "azure.endpoint" => &mut self.config.azure.endpoint,
            "azure.api_version" => &mut self.config.azure.api_version,
            "azure.deployment" => &mut self.config.azure.deployment,
            "fastembed.model" => &mut self.config.fastembed.model,
            other => {
                return Err(Error::config(format!(
                    "Unknown setting '{other}' (expected one of: {})",
                    SETTABLE_FIELDS.join(", ")
                )));
            }
        };
        *slot = value;
        self.invalidate_clients();
        Ok(())
    }

    fn invalidate_clients(&mut self) {
        self.executor = None;
    }

    /// The executor for the current settings, built on first use.
    pub fn executor(&mut self) -> Result<&QueryExecutor> {
        if self.executor.is_none() {
            let store = QdrantClient::from_config(&self.config.qdrant)?;
            let embedder = create_provider(&self.config);
            tracing::debug!(
                provider = embedder.name(),
                url = store.base_url(),
                "built search clients"
            );
            self.executor = Some(QueryExecutor::new(embedder, Arc::new(store)));
        }
        self.executor
            .as_ref()
            .ok_or_else(|| Error::config("search clients unavailable"))
    }

    fn store(&mut self) -> Result<Arc<dyn VectorStore>> {
        Ok(Arc::clone(self.executor()?.store()))
    }

    // ------------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------------

    /// List collections on the server.
    pub async fn list_collections(&mut self) -> Result<Vec<String>> {
        self.store()?.list_collections().await
    }

    /// Select `collection` and discover its filterable keys.
    ///
    /// Existing filter rows are kept; rows whose key the new collection
    /// lacks fail validation until edited.
    pub async fn use_collection(&mut self, collection: &str) -> Result<&[String]> {
        let keys = self.store()?.peek_payload_keys(collection).await?;
        tracing::info!(collection, keys = keys.len(), "selected collection");
        self.collection = Some(collection.to_string());
        self.filters.set_metadata_keys(keys);
        Ok(self.filters.metadata_keys())
    }

    /// Run the search described by the form.
    ///
    /// Filter validation and configuration checks happen before any
    /// remote call.
    pub async fn search(&mut self) -> Result<Vec<Hit>> {
        let collection = self
            .collection
            .clone()
            .ok_or_else(|| Error::validation("No collection selected (use `use <collection>`)"))?;
        if self.query.trim().is_empty() {
            return Err(Error::validation("Query text is empty"));
        }

        let filter = self.filters.compile_checked()?;
        self.config.validate()?;

        let query = self.query.clone();
        let (limit, threshold) = (self.limit, self.score_threshold);
        self.executor()?
            .search(&collection, &query, &filter, limit, threshold)
            .await
    }
}

/// Clamp a limit to `[1, max_limit]`.
pub fn clamp_limit(limit: u64, max_limit: u64) -> u64 {
    limit.clamp(1, max_limit.max(1))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quarry_filter::Category;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(url: &str) -> QuarryConfig {
        let mut config = QuarryConfig {
            provider: ProviderKind::FastEmbed,
            using_env_defaults: false,
            ..Default::default()
        };
        config.qdrant.url = url.to_string();
        config
    }

    async fn mount_scroll(server: &MockServer, collection: &str, payload: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/collections/{collection}/points/scroll")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"points": [{"id": 1, "payload": payload}]},
                "status": "ok"
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0, 30), 1);
        assert_eq!(clamp_limit(5, 30), 5);
        assert_eq!(clamp_limit(100, 30), 30);
        assert_eq!(clamp_limit(3, 0), 1);
    }

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new(QuarryConfig::default());
        assert_eq!(session.limit(), 5);
        assert!(session.collection().is_none());
        assert!(session.filters().is_empty());
        assert!(session.score_threshold().is_none());
    }

    #[test]
    fn test_set_limit_clamps() {
        let mut session = Session::new(QuarryConfig::default());
        assert_eq!(session.set_limit(0), 1);
        assert_eq!(session.set_limit(31), 30);
        assert_eq!(session.set_limit(12), 12);
    }

    #[test]
    fn test_set_score_threshold_rejects_nan() {
        let mut session = Session::new(QuarryConfig::default());
        assert!(session.set_score_threshold(Some(f32::NAN)).is_err());
        session.set_score_threshold(Some(0.7)).unwrap();
        assert_eq!(session.score_threshold(), Some(0.7));
        session.set_score_threshold(None).unwrap();
        assert!(session.score_threshold().is_none());
    }

    #[test]
    fn test_set_field() {
        let mut session = Session::new(QuarryConfig::default());
        session.set_field("qdrant.url", " http://localhost:6333 ").unwrap();
        assert_eq!(session.config().qdrant.url, "http://localhost:6333");
        assert!(session.set_field("qdrant.port", "1").unwrap_err().is_config());
    }

    #[test]
    fn test_set_env_defaults_rereads_variables() {
        let mut session = Session::new(config_for("http://manual:6333"));
        session.set_env_defaults(true, |name| {
            (name == quarry_core::config::ENV_QDRANT_URL).then(|| "http://env:6333".to_string())
        });
        assert!(session.config().using_env_defaults);
        assert_eq!(session.config().qdrant.url, "http://env:6333");

        session.set_env_defaults(false, |_| None);
        assert!(!session.config().using_env_defaults);
        assert_eq!(session.config().qdrant.url, "http://env:6333");
    }

    #[test]
    fn test_set_env_defaults_clears_manual_values() {
        let mut session = Session::new(config_for("http://manual:6333"));
        session.set_field("openai.api_key", "sk-manual").unwrap();

        session.set_env_defaults(true, |_| None);

        assert!(session.config().qdrant.url.is_empty());
        assert!(session.config().openai.api_key.is_empty());
        assert!(session.executor().err().unwrap().is_config());
    }

    #[test]
    fn test_provider_change_rebuilds_clients() {
        let mut session = Session::new(config_for("http://localhost:6333"));
        assert_eq!(session.executor().unwrap().embedder().name(), "fastembed");
        session.set_provider(ProviderKind::OpenAi);
        assert_eq!(session.executor().unwrap().embedder().name(), "openai");
        assert_eq!(session.mode(), EmbedMode::ClientVector);
    }

    #[test]
    fn test_executor_requires_qdrant_url() {
        let mut session = Session::new(config_for(""));
        assert!(session.executor().err().unwrap().is_config());
    }

    #[tokio::test]
    async fn test_use_collection_discovers_keys() {
        let server = MockServer::start().await;
        mount_scroll(&server, "products", json!({"price": 10, "category": "books"})).await;

        let mut session = Session::new(config_for(&server.uri()));
        let keys = session.use_collection("products").await.unwrap().to_vec();
        assert_eq!(keys, vec!["price", "category"]);
        assert_eq!(session.collection(), Some("products"));

        // New rows start on the first key the server returned.
        session.filters_mut().add_row(Category::Must).unwrap();
        assert_eq!(session.filters().rows(Category::Must)[0].key, "price");
    }

    #[tokio::test]
    async fn test_search_requires_collection_and_query() {
        let mut session = Session::new(config_for("http://localhost:6333"));
        assert!(session.search().await.unwrap_err().is_validation());

        let server = MockServer::start().await;
        mount_scroll(&server, "products", json!({"title": "x"})).await;
        let mut session = Session::new(config_for(&server.uri()));
        session.use_collection("products").await.unwrap();
        assert!(session.search().await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_search_validates_filters_before_remote_call() {
        let server = MockServer::start().await;
        mount_scroll(&server, "products", json!({"price": 1})).await;
        Mock::given(method("POST"))
            .and(path("/collections/products/points/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"points": []}
            })))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = Session::new(config_for(&server.uri()));
        session.use_collection("products").await.unwrap();
        session.set_query("cheap");
        session.filters_mut().add_row(Category::Must).unwrap();
        session
            .filters_mut()
            .set_operator(Category::Must, 0, quarry_filter::Operator::Range)
            .unwrap();

        let err = session.search().await.unwrap_err();
        assert!(err.is_validation());
    }
}
