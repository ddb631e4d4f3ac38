//! Embedding provider trait, the server-side marker provider and a mock.
//!
//! A provider either returns a dense vector computed from the query text,
//! or a marker telling the executor to send the raw text and let the vector
//! store embed it.
//!
//! # Providers
//!
//! - `OpenAiProvider` / `AzureOpenAiProvider`: hosted embeddings APIs
//! - `ServerSideProvider`: delegates embedding to Qdrant (FastEmbed)
//! - `MockEmbeddingProvider`: deterministic vectors for testing

use async_trait::async_trait;
use quarry_core::{EmbedMode, Result};

/// Outcome of embedding a query.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedResult {
    /// Dense vector computed on the client.
    Vector(Vec<f32>),
    /// The server should embed `query` with `model`.
    ServerSide {
        /// Raw query text.
        query: String,
        /// Server-side embedding model.
        model: String,
    },
}

impl EmbedResult {
    /// The mode this result calls for.
    pub fn mode(&self) -> EmbedMode {
        match self {
            Self::Vector(_) => EmbedMode::ClientVector,
            Self::ServerSide { .. } => EmbedMode::ServerSide,
        }
    }
}

/// Trait for turning query text into something searchable.
///
/// One implementation per backend, selected from configuration, so call
/// sites never branch on provider names.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single query.
    async fn embed(&self, query: &str) -> Result<EmbedResult>;

    /// Whether this provider computes vectors or delegates to the server.
    fn mode(&self) -> EmbedMode;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Provider that delegates embedding to the vector store.
#[derive(Debug, Clone)]
pub struct ServerSideProvider {
    model: String,
}

impl ServerSideProvider {
    /// Create a provider asking the server to embed with `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ServerSideProvider {
    async fn embed(&self, query: &str) -> Result<EmbedResult> {
        Ok(EmbedResult::ServerSide {
            query: query.to_string(),
            model: self.model.clone(),
        })
    }

    fn mode(&self) -> EmbedMode {
        EmbedMode::ServerSide
    }

    fn name(&self) -> &str {
        "fastembed"
    }
}

/// A mock embedding provider for testing.
///
/// Generates deterministic unit vectors from the input bytes.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte_val = if bytes.is_empty() {
                    0u8
                } else {
                    bytes[i % bytes.len()]
                };
                ((byte_val as f32 + i as f32) % 256.0) / 256.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, query: &str) -> Result<EmbedResult> {
        Ok(EmbedResult::Vector(self.deterministic_embedding(query)))
    }

    fn mode(&self) -> EmbedMode {
        EmbedMode::ClientVector
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================
