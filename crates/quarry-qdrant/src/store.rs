//! Vector store abstraction.

use async_trait::async_trait;
use quarry_core::Result;

use crate::types::{Hit, SearchRequest};

/// The operations Quarry needs from a vector store.
///
/// Every failure is reported as a search error; implementations never
/// retry.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Payload field names of one record, used as the filterable keys.
    ///
    /// Returns an empty list for an empty collection.
    async fn peek_payload_keys(&self, collection: &str) -> Result<Vec<String>>;

    /// Run one search and return hits in ranked order.
    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<Hit>>;

    /// Store name for diagnostics.
    fn name(&self) -> &str;
}
