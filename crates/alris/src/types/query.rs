//! Query request types

use serde::{Deserialize, Serialize};

/// Retrieval strategy requested by a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Semantic search on the query text, vectorized by the store
    #[default]
    NearText,
    /// Keyword (BM25) and vector search fused
    Hybrid,
}

/// Body of `POST /ask` and `POST /search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    /// The natural-language question
    #[serde(default)]
    pub query: Option<String>,

    /// Collection to search (default from configuration)
    #[serde(default)]
    pub collection: Option<String>,

    /// Number of chunks to retrieve (default from configuration)
    #[serde(default)]
    pub limit: Option<usize>,

    /// Retrieval strategy (default from configuration)
    #[serde(default)]
    pub mode: Option<SearchMode>,
}

impl AskRequest {
    /// Create a new request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Target a specific collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the number of chunks to retrieve
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the retrieval strategy
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// The trimmed query text, if present and non-blank
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}
