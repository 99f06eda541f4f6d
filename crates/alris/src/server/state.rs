//! Application state for the ALRIS server

use std::sync::Arc;

use crate::config::AlrisConfig;
use crate::error::Result;
use crate::providers::{
    EmbeddingProvider, HuggingFaceClient, LlmProvider, VectorStoreProvider, WeaviateClient,
};
use crate::rag::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AlrisConfig,
    /// Retrieval + generation
    rag: RagService,
}

impl AppState {
    /// Create state backed by Weaviate and Hugging Face
    pub fn new(config: AlrisConfig) -> Result<Self> {
        tracing::info!("Initializing ALRIS application state...");

        let vector_store = Arc::new(WeaviateClient::new(
            &config.weaviate,
            config.huggingface.api_key.as_deref(),
        )?);
        tracing::info!("Weaviate client initialized ({})", config.weaviate.url);

        let huggingface = Arc::new(HuggingFaceClient::new(&config.huggingface)?);
        tracing::info!(
            "Hugging Face client initialized (chat: {}, summarization: {})",
            config.huggingface.chat_model,
            config.huggingface.summarization_model
        );

        Ok(Self::from_parts(
            config,
            vector_store,
            huggingface.clone(),
            huggingface,
        ))
    }

    /// Create state over arbitrary providers
    pub fn from_parts(
        config: AlrisConfig,
        vector_store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let rag = RagService::new(&config, vector_store, embedder, llm);
        Self {
            inner: Arc::new(AppStateInner { config, rag }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AlrisConfig {
        &self.inner.config
    }

    /// Get the RAG service
    pub fn rag(&self) -> &RagService {
        &self.inner.rag
    }

    /// Ready when the vector store answers its health check
    pub async fn is_ready(&self) -> bool {
        match self.inner.rag.vector_store().health_check().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!("Vector store health check failed: {}", e);
                false
            }
        }
    }
}
