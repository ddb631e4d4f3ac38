//! Query embedding for Quarry.
//!
//! This crate abstracts over the embedding backends a session can select,
//! so the query executor issues one uniform request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  EmbeddingProvider trait  ──▶  EmbedResult                  │
//! │  ├── OpenAiProvider       ──▶  Vector(Vec<f32>)             │
//! │  ├── AzureOpenAiProvider  ──▶  Vector(Vec<f32>)             │
//! │  ├── ServerSideProvider   ──▶  ServerSide { query, model }  │
//! │  └── MockEmbeddingProvider (tests)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries and no caching: every query is embedded exactly once.

pub mod embedding;
pub mod openai;

use std::sync::Arc;

use quarry_core::{ProviderKind, QuarryConfig};

pub use embedding::{EmbedResult, EmbeddingProvider, MockEmbeddingProvider, ServerSideProvider};
pub use openai::{AzureOpenAiProvider, OpenAiProvider};

/// Build the provider selected by `config`.
///
/// Credentials are checked lazily: a provider with missing keys is still
/// created and reports a provider error on its first `embed` call.
pub fn create_provider(config: &QuarryConfig) -> Arc<dyn EmbeddingProvider> {
    log::debug!("creating embedding provider: {}", config.provider);
    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(&config.openai)),
        ProviderKind::Azure => Arc::new(AzureOpenAiProvider::from_config(&config.azure)),
        ProviderKind::FastEmbed => Arc::new(ServerSideProvider::new(&config.fastembed.model)),
    }
}
