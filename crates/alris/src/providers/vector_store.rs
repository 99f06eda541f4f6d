//! Vector store provider trait for collections, inserts and similarity search

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentChunk, SearchHit};

/// How a collection turns stored text into vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vectorizer {
    /// The store vectorizes `content` with a Hugging Face model
    HuggingFace {
        /// Model id, e.g. `Snowflake/snowflake-arctic-embed-l-v2.0`
        model: String,
    },
    /// Vectors are supplied by the caller on insert and search
    None,
}

/// Retrieval strategy understood by the store
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStrategy {
    /// Semantic search on the query text
    NearText,
    /// Fused keyword + vector search; `alpha` 0 is pure keyword, 1 pure vector
    Hybrid { alpha: f32 },
    /// Search with a precomputed query vector
    NearVector(Vec<f32>),
}

/// A similarity query against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query text
    pub query: String,
    /// Retrieval strategy
    pub strategy: SearchStrategy,
    /// Maximum hits
    pub limit: usize,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `WeaviateClient`: Weaviate REST + GraphQL API
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Names of all collections
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Check whether a collection exists
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection with the chunk schema
    async fn create_collection(&self, name: &str, vectorizer: &Vectorizer) -> Result<()>;

    /// Create the collection unless it already exists; returns true when created
    async fn ensure_collection(&self, name: &str, vectorizer: &Vectorizer) -> Result<bool> {
        if self.collection_exists(name).await? {
            tracing::info!("Collection \"{}\" already exists", name);
            return Ok(false);
        }
        tracing::info!("Creating collection \"{}\"", name);
        self.create_collection(name, vectorizer).await?;
        Ok(true)
    }

    /// Insert chunks, optionally with one precomputed vector per chunk.
    /// Returns the number of objects written.
    async fn insert_chunks(
        &self,
        collection: &str,
        chunks: &[DocumentChunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<usize>;

    /// Search a collection
    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
