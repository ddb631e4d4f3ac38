//! Query executor: embed, attach the filter, search.

use std::sync::Arc;

use quarry_core::{EmbedMode, Result};
use quarry_embed::EmbeddingProvider;
use quarry_filter::CompiledFilter;

use crate::store::VectorStore;
use crate::types::{Hit, SearchRequest};

/// Runs one filtered search per call.
///
/// Holds the session's embedding provider and vector store. There is no
/// retry and no partial result: either every hit comes back or an error.
#[derive(Clone)]
pub struct QueryExecutor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl QueryExecutor {
    /// Create an executor from a provider and a store.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// The embedding provider in use.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The vector store in use.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Search `collection` for `query`.
    ///
    /// `limit` is passed through unchanged. `score_threshold` is dropped
    /// when the provider delegates embedding to the server.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        filter: &CompiledFilter,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> Result<Vec<Hit>> {
        let embedded = self.embedder.embed(query).await?;
        let mode = embedded.mode();

        if mode == EmbedMode::ServerSide && score_threshold.is_some() {
            tracing::debug!("score threshold ignored for server-side embedding");
        }

        let request = SearchRequest {
            query: embedded.into(),
            filter: filter.clone(),
            limit,
            score_threshold: match mode {
                EmbedMode::ClientVector => score_threshold,
                EmbedMode::ServerSide => None,
            },
        };

        tracing::info!(
            collection,
            provider = self.embedder.name(),
            store = self.store.name(),
            limit,
            conditions = filter.len(),
            "running search"
        );

        let hits = self.store.search(collection, &request).await?;
        tracing::debug!(count = hits.len(), "search returned");
        Ok(hits)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quarry_core::Error;
    use quarry_embed::{MockEmbeddingProvider, ServerSideProvider};
    use quarry_filter::{Bounds, Category, FilterBuilder, Operator};
    use serde_json::{Map, json};
    use std::sync::Mutex;

    /// Store that records requests and answers with canned hits.
    #[derive(Default)]
    struct RecordingStore {
        requests: Mutex<Vec<(String, SearchRequest)>>,
        fail: bool,
    }

    impl RecordingStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn last(&self) -> SearchRequest {
            self.requests.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn list_collections(&self) -> Result<Vec<String>> {
            Ok(vec!["products".into()])
        }

        async fn peek_payload_keys(&self, _collection: &str) -> Result<Vec<String>> {
            Ok(vec!["category".into(), "price".into()])
        }

        async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
            self.requests
                .lock()
                .unwrap()
                .push((collection.to_string(), request.clone()));
            if self.fail {
                return Err(Error::search("collection not found"));
            }
            let mut payload = Map::new();
            payload.insert("title".into(), json!("Lamp"));
            Ok(vec![Hit {
                id: json!(1),
                score: 0.9,
                payload,
            }])
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _query: &str) -> Result<quarry_embed::EmbedResult> {
            Err(Error::provider("OpenAI API key is not set"))
        }

        fn mode(&self) -> EmbedMode {
            EmbedMode::ClientVector
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_server_side_drops_threshold() {
        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(Arc::new(ServerSideProvider::new("m")), store.clone());

        executor
            .search("products", "red shoes", &CompiledFilter::default(), 5, Some(0.7))
            .await
            .unwrap();

        let request = store.last();
        assert_eq!(request.limit, 5);
        assert_eq!(request.score_threshold, None);
        assert!(request.to_body().get("score_threshold").is_none());
        assert_eq!(request.endpoint(), "points/query");
    }

    #[tokio::test]
    async fn test_vector_mode_keeps_threshold() {
        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(Arc::new(MockEmbeddingProvider::new(8)), store.clone());

        executor
            .search("products", "red shoes", &CompiledFilter::default(), 5, Some(0.7))
            .await
            .unwrap();

        let request = store.last();
        assert_eq!(request.score_threshold, Some(0.7));
        assert!(matches!(&request.query, crate::types::QueryInput::Vector(v) if v.len() == 8));
    }

    #[tokio::test]
    async fn test_limit_is_not_clamped() {
        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(Arc::new(MockEmbeddingProvider::new(4)), store.clone());

        executor
            .search("products", "q", &CompiledFilter::default(), 500, None)
            .await
            .unwrap();
        assert_eq!(store.last().limit, 500);
    }

    #[tokio::test]
    async fn test_filter_is_forwarded() {
        let mut builder = FilterBuilder::new(vec!["category".into(), "price".into()]);
        builder.add_row(Category::Must).unwrap();
        builder.set_match_value(Category::Must, 0, "electronics").unwrap();
        builder.add_row(Category::Must).unwrap();
        builder.set_key(Category::Must, 1, "price").unwrap();
        builder.set_operator(Category::Must, 1, Operator::Range).unwrap();
        builder
            .set_bounds(Category::Must, 1, Bounds::between(10, 100))
            .unwrap();
        let filter = builder.compile_checked().unwrap();

        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(Arc::new(MockEmbeddingProvider::new(4)), store.clone());
        executor
            .search("products", "laptop", &filter, 5, None)
            .await
            .unwrap();

        let body = store.last().to_body();
        assert_eq!(
            body["filter"],
            json!({
                "must": [
                    {"key": "category", "match": {"value": "electronics"}},
                    {"key": "price", "range": {"gte": 10, "lte": 100}}
                ],
                "must_not": [],
                "should": []
            })
        );
    }

    #[tokio::test]
    async fn test_provider_failure_skips_store() {
        let store = Arc::new(RecordingStore::default());
        let executor = QueryExecutor::new(Arc::new(FailingEmbedder), store.clone());

        let err = executor
            .search("products", "q", &CompiledFilter::default(), 5, None)
            .await
            .unwrap_err();
        assert!(err.is_provider());
        assert!(store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_search_error() {
        let store = Arc::new(RecordingStore::failing());
        let executor = QueryExecutor::new(Arc::new(MockEmbeddingProvider::new(4)), store);

        let err = executor
            .search("missing", "q", &CompiledFilter::default(), 5, None)
            .await
            .unwrap_err();
        assert!(err.is_search());
    }
}
