//! Provider abstractions for the external services
//!
//! The vector store (Weaviate) and the inference API (Hugging Face) sit behind
//! traits so the request path can be exercised against fakes.

pub mod embedding;
pub mod huggingface;
pub mod llm;
pub mod vector_store;
pub mod weaviate;

pub use embedding::EmbeddingProvider;
pub use huggingface::HuggingFaceClient;
pub use llm::LlmProvider;
pub use vector_store::{SearchRequest, SearchStrategy, VectorStoreProvider, Vectorizer};
pub use weaviate::WeaviateClient;
