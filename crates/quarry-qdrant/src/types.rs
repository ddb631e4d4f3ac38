//! Search requests and hits.
//!
//! A [`SearchRequest`] knows how to lay itself out as a Qdrant request body
//! for either mode:
//!
//! | Mode | Endpoint | Body |
//! |---|---|---|
//! | client vector | `points/search` | `{vector, limit, with_payload, filter?, score_threshold?}` |
//! | server-side | `points/query` | `{query: {text, model}, limit, with_payload, filter?}` |

use quarry_core::EmbedMode;
use quarry_embed::EmbedResult;
use quarry_filter::CompiledFilter;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

/// What the store searches with.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// A client-computed dense vector.
    Vector(Vec<f32>),
    /// Raw text the server embeds with `model`.
    Text {
        /// Query text.
        text: String,
        /// Server-side embedding model.
        model: String,
    },
}

impl From<EmbedResult> for QueryInput {
    fn from(result: EmbedResult) -> Self {
        match result {
            EmbedResult::Vector(v) => Self::Vector(v),
            EmbedResult::ServerSide { query, model } => Self::Text { text: query, model },
        }
    }
}

/// One search call against a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Vector or text to search with.
    pub query: QueryInput,
    /// Compiled boolean filter; omitted from the body when empty.
    pub filter: CompiledFilter,
    /// Maximum number of hits.
    pub limit: u64,
    /// Minimum score; only honoured in vector mode.
    pub score_threshold: Option<f32>,
}

impl SearchRequest {
    /// The embedding mode of this request.
    pub fn mode(&self) -> EmbedMode {
        match self.query {
            QueryInput::Vector(_) => EmbedMode::ClientVector,
            QueryInput::Text { .. } => EmbedMode::ServerSide,
        }
    }

    /// Collection-relative endpoint path.
    pub fn endpoint(&self) -> &'static str {
        match self.mode() {
            EmbedMode::ClientVector => "points/search",
            EmbedMode::ServerSide => "points/query",
        }
    }

    /// Request body for [`endpoint`](Self::endpoint).
    pub fn to_body(&self) -> Value {
        let mut body = match &self.query {
            QueryInput::Vector(vector) => json!({
                "vector": vector,
                "limit": self.limit,
                "with_payload": true,
            }),
            QueryInput::Text { text, model } => json!({
                "query": { "text": text, "model": model },
                "limit": self.limit,
                "with_payload": true,
            }),
        };

        if let Some(filter) = self.filter.to_request_value() {
            body["filter"] = filter;
        }

        if let (QueryInput::Vector(_), Some(threshold)) = (&self.query, self.score_threshold) {
            body["score_threshold"] = json!(threshold);
        }

        body
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Point id (integer or UUID string).
    #[serde(default)]
    pub id: Value,

    /// Similarity score.
    pub score: f32,

    /// Stored payload; empty when the point has none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
