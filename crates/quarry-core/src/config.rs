//! Session configuration.
//!
//! [`QuarryConfig`] holds the provider selection, per-provider credentials
//! and the Qdrant endpoint for one session. It is seeded from a config file
//! and `QUARRY_*` variables (see the CLI crate), then overlaid with the
//! well-known environment variables when `using_env_defaults` is on.
//!
//! Empty strings mean "not set", matching how the values arrive from
//! environment variables and form fields.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;
use crate::{Error, Result};

/// OpenAI API key variable.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Qdrant server URL variable.
pub const ENV_QDRANT_URL: &str = "QDRANT_URL";
/// Qdrant API key variable.
pub const ENV_QDRANT_KEY: &str = "QDRANT_KEY";
/// Azure API key variable.
pub const ENV_AZURE_API_KEY: &str = "AZURE_API_KEY";
/// Azure endpoint variable.
pub const ENV_AZURE_ENDPOINT: &str = "AZURE_ENDPOINT";
/// Azure API version variable.
pub const ENV_AZURE_API_VERSION: &str = "AZURE_API_VERSION";

// ============================================================================
// Configuration structs
// ============================================================================

/// Configuration for one Quarry session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Selected embedding provider.
    pub provider: ProviderKind,

    /// Overlay the well-known environment variables on top of this config.
    pub using_env_defaults: bool,

    /// Vector store endpoint.
    pub qdrant: QdrantConfig,

    /// OpenAI credentials.
    pub openai: OpenAiConfig,

    /// Azure OpenAI credentials.
    pub azure: AzureConfig,

    /// Server-side embedding settings.
    pub fastembed: FastEmbedConfig,

    /// Search form settings.
    pub search: SearchConfig,
}

/// Qdrant endpoint configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Server URL, e.g. `http://localhost:6333`.
    pub url: String,
    /// API key sent as the `api-key` header.
    pub api_key: String,
}

/// OpenAI embeddings configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key.
    pub api_key: String,
    /// Embedding model.
    pub model: String,
    /// API base URL.
    pub base_url: String,
}

/// Azure OpenAI embeddings configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// API key.
    pub api_key: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// API version query parameter.
    pub api_version: String,
    /// Embedding deployment name.
    pub deployment: String,
}

/// Server-side embedding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastEmbedConfig {
    /// Model the server uses to embed the query text.
    pub model: String,
}

/// Search form limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Initial result limit.
    pub default_limit: u64,
    /// Upper bound for the result limit accepted by the form.
    pub max_limit: u64,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            using_env_defaults: true,
            qdrant: QdrantConfig::default(),
            openai: OpenAiConfig::default(),
            azure: AzureConfig::default(),
            fastembed: FastEmbedConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            api_version: String::new(),
            deployment: "text-embedding-ada-002".to_string(),
        }
    }
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-minilm-l6-v2".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 30,
        }
    }
}

// ============================================================================
// Environment defaults
// ============================================================================

/// One line of the configuration status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// What the entry describes, e.g. "Qdrant URL".
    pub label: &'static str,
    /// Whether a non-empty value is present.
    pub set: bool,
}

impl QuarryConfig {
    /// Overlay the well-known environment variables using `lookup`.
    ///
    /// Does nothing unless `using_env_defaults` is on. Only variables that
    /// are present and non-empty replace configured values.
    pub fn apply_env_defaults<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.using_env_defaults {
            return;
        }

        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_QDRANT_URL) {
            self.qdrant.url = v;
        }
        if let Some(v) = get(ENV_QDRANT_KEY) {
            self.qdrant.api_key = v;
        }
        if let Some(v) = get(ENV_OPENAI_API_KEY) {
            self.openai.api_key = v;
        }
        if let Some(v) = get(ENV_AZURE_API_KEY) {
            self.azure.api_key = v;
        }
        if let Some(v) = get(ENV_AZURE_ENDPOINT) {
            self.azure.endpoint = v;
        }
        if let Some(v) = get(ENV_AZURE_API_VERSION) {
            self.azure.api_version = v;
        }
        log::debug!("applied environment defaults (provider: {})", self.provider);
    }

    /// Turn the environment defaults on and reload every variable-backed
    /// field through `lookup`. Unset variables clear their field.
    pub fn reset_from_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.using_env_defaults = true;
        let get = |name: &str| lookup(name).unwrap_or_default();

        self.qdrant.url = get(ENV_QDRANT_URL);
        self.qdrant.api_key = get(ENV_QDRANT_KEY);
        self.openai.api_key = get(ENV_OPENAI_API_KEY);
        self.azure.api_key = get(ENV_AZURE_API_KEY);
        self.azure.endpoint = get(ENV_AZURE_ENDPOINT);
        self.azure.api_version = get(ENV_AZURE_API_VERSION);
        log::debug!("reloaded settings from the environment");
    }

    /// Overlay the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env_defaults(|name| std::env::var(name).ok());
    }

    /// Check that everything the selected provider needs is present.
    pub fn validate(&self) -> Result<()> {
        if self.qdrant.url.trim().is_empty() {
            return Err(Error::config(format!(
                "Qdrant URL is not set (config `qdrant.url` or {ENV_QDRANT_URL})"
            )));
        }

        match self.provider {
            ProviderKind::OpenAi => {
                if self.openai.api_key.is_empty() {
                    return Err(Error::config(format!(
                        "OpenAI API key is not set (config `openai.api_key` or {ENV_OPENAI_API_KEY})"
                    )));
                }
            }
            ProviderKind::Azure => {
                let missing: Vec<&str> = [
                    ("azure.api_key", &self.azure.api_key),
                    ("azure.endpoint", &self.azure.endpoint),
                    ("azure.api_version", &self.azure.api_version),
                    ("azure.deployment", &self.azure.deployment),
                ]
                .into_iter()
                .filter(|(_, v)| v.is_empty())
                .map(|(k, _)| k)
                .collect();
                if !missing.is_empty() {
                    return Err(Error::config(format!(
                        "Azure settings missing: {}",
                        missing.join(", ")
                    )));
                }
            }
            ProviderKind::FastEmbed => {}
        }

        Ok(())
    }

    /// Report which credentials are set for the active provider.
    pub fn status(&self) -> Vec<StatusEntry> {
        let mut entries = Vec::new();
        match self.provider {
            ProviderKind::OpenAi => entries.push(StatusEntry {
                label: "OpenAI API Key",
                set: !self.openai.api_key.is_empty(),
            }),
            ProviderKind::Azure => {
                entries.push(StatusEntry {
                    label: "Azure API Key",
                    set: !self.azure.api_key.is_empty(),
                });
                entries.push(StatusEntry {
                    label: "Azure Endpoint",
                    set: !self.azure.endpoint.is_empty(),
                });
                entries.push(StatusEntry {
                    label: "Azure API Version",
                    set: !self.azure.api_version.is_empty(),
                });
            }
            ProviderKind::FastEmbed => {}
        }
        entries.push(StatusEntry {
            label: "Qdrant URL",
            set: !self.qdrant.url.is_empty(),
        });
        entries.push(StatusEntry {
            label: "Qdrant API Key",
            set: !self.qdrant.api_key.is_empty(),
        });
        entries
    }
}

// ============================================================================
// Tests
// ============================================================================
