//! Retrieval + answer synthesis for a single question

use std::sync::Arc;
use std::time::Instant;

use crate::config::{AlrisConfig, AnswerMode, RetrievalConfig};
use crate::error::{Error, Result};
use crate::generation::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::providers::{
    EmbeddingProvider, LlmProvider, SearchRequest, SearchStrategy, VectorStoreProvider,
};
use crate::types::{AskRequest, AskResponse, SearchHit, SearchMode};

/// Upper bound on chunks retrieved per request
pub const MAX_LIMIT: usize = 50;

/// Question answering over a vector store collection
pub struct RagService {
    vector_store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    default_collection: String,
    client_side_vectors: bool,
    retrieval: RetrievalConfig,
}

impl RagService {
    /// Create a service over the given providers
    pub fn new(
        config: &AlrisConfig,
        vector_store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        tracing::info!(
            "RAG service over {} (embeddings: {}, llm: {} {})",
            vector_store.name(),
            embedder.name(),
            llm.name(),
            llm.model()
        );
        Self {
            vector_store,
            embedder,
            llm,
            default_collection: config.weaviate.default_collection.clone(),
            client_side_vectors: config.weaviate.client_side_vectors,
            retrieval: config.retrieval.clone(),
        }
    }

    /// Get the vector store provider
    pub fn vector_store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.vector_store
    }

    /// Names of the collections in the vector store
    pub async fn collections(&self) -> Result<Vec<String>> {
        self.vector_store.list_collections().await
    }

    /// Whether the inference providers this service calls answer their health checks.
    /// The embedder is only consulted when queries are vectorized client-side.
    pub async fn inference_available(&self) -> bool {
        let llm = match self.llm.health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("{} health check failed: {}", self.llm.name(), e);
                false
            }
        };
        if !llm || !self.client_side_vectors {
            return llm;
        }

        match self.embedder.health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("{} health check failed: {}", self.embedder.name(), e);
                false
            }
        }
    }

    /// Retrieve the chunks most similar to the query, without an LLM call
    pub async fn search(&self, request: &AskRequest) -> Result<Vec<SearchHit>> {
        let query = Self::validate_query(request)?;
        self.retrieve(query, request).await
    }

    /// Retrieve context and synthesize an answer
    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let start = Instant::now();
        let query = Self::validate_query(request)?;

        tracing::info!("Query: \"{}\"", query);

        let hits = self.retrieve(query, request).await?;
        if hits.is_empty() {
            tracing::info!("No chunks retrieved, skipping generation");
            return Ok(AskResponse::not_found());
        }

        let Some(answer) = self.synthesize(query, &hits).await? else {
            tracing::info!("Retrieved chunks carry no text, skipping generation");
            return Ok(AskResponse::not_found());
        };
        let response = AskResponse::new(answer, &hits);

        tracing::info!(
            "Query completed in {}ms, {} chunks from {} sources",
            start.elapsed().as_millis(),
            hits.len(),
            response.sources.len()
        );

        Ok(response)
    }

    fn validate_query(request: &AskRequest) -> Result<&str> {
        request
            .query_text()
            .ok_or_else(|| Error::invalid_request("query is required"))
    }

    async fn retrieve(&self, query: &str, request: &AskRequest) -> Result<Vec<SearchHit>> {
        let collection = self.resolve_collection(request).await?;
        let limit = self.resolve_limit(request)?;
        let strategy = self.strategy(query, request.mode).await?;

        let search = SearchRequest {
            query: query.to_string(),
            strategy,
            limit,
        };
        let hits = self.vector_store.search(&collection, &search).await?;

        tracing::debug!("Retrieved {} chunks from {}", hits.len(), collection);
        Ok(hits)
    }

    async fn resolve_collection(&self, request: &AskRequest) -> Result<String> {
        let name = request
            .collection
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_collection);

        if !self.vector_store.collection_exists(name).await? {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn resolve_limit(&self, request: &AskRequest) -> Result<usize> {
        match request.limit {
            Some(0) => Err(Error::invalid_request("limit must be at least 1")),
            Some(limit) => Ok(limit.min(MAX_LIMIT)),
            None => Ok(self.retrieval.limit.min(MAX_LIMIT)),
        }
    }

    async fn strategy(&self, query: &str, mode: Option<SearchMode>) -> Result<SearchStrategy> {
        // Collections without a store-side vectorizer can only be searched by vector
        if self.client_side_vectors {
            let vector = self.embedder.embed(query).await?;
            return Ok(SearchStrategy::NearVector(vector));
        }

        Ok(match mode.unwrap_or(self.retrieval.mode) {
            SearchMode::NearText => SearchStrategy::NearText,
            SearchMode::Hybrid => SearchStrategy::Hybrid {
                alpha: self.retrieval.hybrid_alpha,
            },
        })
    }

    /// `None` when there is nothing to summarize
    async fn synthesize(&self, question: &str, hits: &[SearchHit]) -> Result<Option<String>> {
        match self.retrieval.answer_mode {
            AnswerMode::Chat => {
                let context = PromptBuilder::build_context(hits);
                let prompt = PromptBuilder::build_rag_prompt(question, &context);
                self.llm.chat(SYSTEM_PROMPT, &prompt).await.map(Some)
            }
            AnswerMode::Summarize => {
                let input = PromptBuilder::build_summary_input(hits);
                if input.trim().is_empty() {
                    return Ok(None);
                }
                self.llm.summarize(&input).await.map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hit, FakeEmbedder, FakeLlm, FakeVectorStore};

    fn service(
        config: &AlrisConfig,
        store: Arc<FakeVectorStore>,
        llm: Arc<FakeLlm>,
    ) -> RagService {
        RagService::new(config, store, Arc::new(FakeEmbedder::new(4)), llm)
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_search() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![hit("a.md", "x")]));
        let rag = service(&AlrisConfig::default(), store.clone(), Arc::new(FakeLlm::new("unused")));

        let err = rag.ask(&AskRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(store.searches().is_empty());

        let err = rag.ask(&AskRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![]));
        let rag = service(&AlrisConfig::default(), store, Arc::new(FakeLlm::new("unused")));

        let err = rag
            .ask(&AskRequest::new("q").with_collection("Missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound(name) if name == "Missing"));
    }

    #[tokio::test]
    async fn test_answer_with_deduplicated_sources() {
        let store = Arc::new(FakeVectorStore::new(
            &["Document"],
            vec![
                hit("guide.md", "Install with cargo."),
                hit("faq.pdf", "Run the server."),
                hit("guide.md", "Configure the port."),
            ],
        ));
        let llm = Arc::new(FakeLlm::new("Use cargo install."));
        let rag = service(&AlrisConfig::default(), store.clone(), llm.clone());

        let response = rag.ask(&AskRequest::new("How do I install it?")).await.unwrap();
        assert_eq!(response.answer, "Use cargo install.");
        assert_eq!(response.sources, vec!["guide.md", "faq.pdf"]);

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("How do I install it?"));
        assert!(prompts[0].contains("Configure the port."));

        let searches = store.searches();
        assert_eq!(searches[0].0, "Document");
        assert_eq!(searches[0].1.limit, 3);
        assert_eq!(searches[0].1.strategy, SearchStrategy::NearText);
    }

    #[tokio::test]
    async fn test_no_hits_skips_llm() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![]));
        let llm = Arc::new(FakeLlm::new("unused"));
        let rag = service(&AlrisConfig::default(), store, llm.clone());

        let response = rag.ask(&AskRequest::new("anything")).await.unwrap();
        assert_eq!(response, AskResponse::not_found());
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_mode_and_limit() {
        let mut config = AlrisConfig::default();
        config.retrieval.hybrid_alpha = 0.7;
        let store = Arc::new(FakeVectorStore::new(&["Document", "Notes"], vec![hit("n.txt", "x")]));
        let rag = service(&config, store.clone(), Arc::new(FakeLlm::new("ok")));

        let request = AskRequest::new("q")
            .with_collection("Notes")
            .with_mode(SearchMode::Hybrid)
            .with_limit(500);
        rag.search(&request).await.unwrap();

        let searches = store.searches();
        assert_eq!(searches[0].0, "Notes");
        assert_eq!(searches[0].1.limit, MAX_LIMIT);
        assert_eq!(searches[0].1.strategy, SearchStrategy::Hybrid { alpha: 0.7 });
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![]));
        let rag = service(&AlrisConfig::default(), store, Arc::new(FakeLlm::new("ok")));
        let err = rag.search(&AskRequest::new("q").with_limit(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_client_side_vectors_search_by_vector() {
        let mut config = AlrisConfig::default();
        config.weaviate.client_side_vectors = true;
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![hit("a.md", "x")]));
        let rag = service(&config, store.clone(), Arc::new(FakeLlm::new("ok")));

        rag.search(&AskRequest::new("q")).await.unwrap();
        assert_eq!(
            store.searches()[0].1.strategy,
            SearchStrategy::NearVector(vec![1.0; 4])
        );
    }

    #[tokio::test]
    async fn test_summarize_mode() {
        let mut config = AlrisConfig::default();
        config.retrieval.answer_mode = AnswerMode::Summarize;
        let store = Arc::new(FakeVectorStore::new(
            &["Document"],
            vec![hit("a.md", "first"), hit("b.md", "second")],
        ));
        let llm = Arc::new(FakeLlm::new("summary"));
        let rag = service(&config, store, llm.clone());

        let response = rag.ask(&AskRequest::new("q")).await.unwrap();
        assert_eq!(response.answer, "summary");
        assert_eq!(llm.summaries(), vec!["first\n\nsecond".to_string()]);
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_blank_chunks_is_not_found() {
        let mut config = AlrisConfig::default();
        config.retrieval.answer_mode = AnswerMode::Summarize;
        let store = Arc::new(FakeVectorStore::new(
            &["Document"],
            vec![hit("a.md", "  "), hit("b.md", "\n\t")],
        ));
        let llm = Arc::new(FakeLlm::new("unused"));
        let rag = service(&config, store, llm.clone());

        let response = rag.ask(&AskRequest::new("q")).await.unwrap();
        assert_eq!(response, AskResponse::not_found());
        assert!(llm.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_inference_available() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![]));
        let rag = service(&AlrisConfig::default(), store.clone(), Arc::new(FakeLlm::new("ok")));
        assert!(rag.inference_available().await);

        let mut config = AlrisConfig::default();
        config.weaviate.client_side_vectors = true;
        let rag = service(&config, store, Arc::new(FakeLlm::failing()));
        assert!(!rag.inference_available().await);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let store = Arc::new(FakeVectorStore::new(&["Document"], vec![hit("a.md", "x")]));
        let rag = service(&AlrisConfig::default(), store, Arc::new(FakeLlm::failing()));

        let err = rag.ask(&AskRequest::new("q")).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}
