//! Qdrant access and filtered query execution for Quarry.
//!
//! - [`VectorStore`]: the store operations a session needs
//! - [`QdrantClient`]: the REST implementation
//! - [`QueryExecutor`]: embeds a query, attaches a compiled filter and
//!   runs the search
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quarry_embed::ServerSideProvider;
//! use quarry_filter::FilterBuilder;
//! use quarry_qdrant::{QdrantClient, QueryExecutor};
//!
//! # async fn run() -> quarry_core::Result<()> {
//! let store = QdrantClient::new("http://localhost:6333", None)?;
//! let executor = QueryExecutor::new(
//!     Arc::new(ServerSideProvider::new("sentence-transformers/all-minilm-l6-v2")),
//!     Arc::new(store),
//! );
//! let filter = FilterBuilder::new(vec![]).compile();
//! let hits = executor.search("products", "desk lamp", &filter, 5, None).await?;
//! for hit in hits {
//!     println!("{} {:?}", hit.score, hit.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod executor;
pub mod store;
pub mod types;

pub use client::QdrantClient;
pub use executor::QueryExecutor;
pub use store::VectorStore;
pub use types::{Hit, QueryInput, SearchRequest};
