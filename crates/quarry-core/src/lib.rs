//! Core types shared by the Quarry crates.
//!
//! - [`Error`] / [`Result`]: the error taxonomy (configuration, provider,
//!   search, validation)
//! - [`ProviderKind`] / [`EmbedMode`]: embedding backend selection
//! - [`QuarryConfig`]: per-session configuration with environment defaults

pub mod config;
pub mod error;
pub mod provider;

pub use config::{
    AzureConfig, FastEmbedConfig, OpenAiConfig, QdrantConfig, QuarryConfig, SearchConfig,
    StatusEntry,
};
pub use error::{Error, Result};
pub use provider::{EmbedMode, ProviderKind};
