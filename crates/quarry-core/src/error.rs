//! Error types for Quarry operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Quarry crates. Uses `thiserror` for derive macros.
//!
//! The variants follow where a failure originates: the session
//! configuration, the embedding provider, the vector store, or the filter
//! builder. Remote failures are never retried.

use thiserror::Error;

/// Errors that can occur in Quarry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid credentials, URLs or settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider failed to produce a vector.
    #[error("Embedding provider error: {message}")]
    Provider {
        /// Human-readable description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The vector store rejected or failed a request.
    #[error("Search error: {message}")]
    Search {
        /// Human-readable description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A filter row is malformed or references an unknown field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error without an underlying cause.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a provider error wrapping its cause.
    pub fn provider_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search error without an underlying cause.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a search error wrapping its cause.
    pub fn search_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Search {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True for embedding provider errors.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    /// True for vector store errors.
    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search { .. })
    }

    /// True for filter validation errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True when the failure came from a remote collaborator.
    pub fn is_remote(&self) -> bool {
        self.is_provider() || self.is_search()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Quarry's Error type.
pub type Result<T> = std::result::Result<T, Error>;
