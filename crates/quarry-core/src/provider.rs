//! Embedding provider kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The embedding backend selected for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted OpenAI embeddings API.
    #[default]
    OpenAi,
    /// Embedding delegated to the vector store (server-side FastEmbed).
    FastEmbed,
    /// Azure-hosted OpenAI embeddings deployment.
    Azure,
}

/// How a provider turns query text into something searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// The client computes a dense vector and searches by vector.
    ClientVector,
    /// The raw text is sent and the server embeds it.
    ServerSide,
}

impl ProviderKind {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::FastEmbed => "fastembed",
            Self::Azure => "azure",
        }
    }

    /// Embedding mode used by this provider.
    pub fn mode(&self) -> EmbedMode {
        match self {
            Self::OpenAi | Self::Azure => EmbedMode::ClientVector,
            Self::FastEmbed => EmbedMode::ServerSide,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "fastembed" => Ok(Self::FastEmbed),
            "azure" => Ok(Self::Azure),
            other => Err(Error::config(format!(
                "Unknown embedding provider: '{other}'. Supported: openai, azure, fastembed"
            ))),
        }
    }
}
