//! In-memory providers for unit tests

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::providers::{
    EmbeddingProvider, LlmProvider, SearchRequest, VectorStoreProvider, Vectorizer,
};
use crate::types::{DocumentChunk, SearchHit};

pub fn hit(file_name: &str, content: &str) -> SearchHit {
    SearchHit {
        content: content.into(),
        file_name: file_name.into(),
        file_type: ".md".into(),
        chunk_id: None,
        distance: Some(0.2),
        score: None,
    }
}

/// Vector store returning canned hits and recording every call
#[derive(Default)]
pub struct FakeVectorStore {
    collections: Mutex<Vec<String>>,
    hits: Vec<SearchHit>,
    pub fail_search: bool,
    /// Inserts into this collection are rejected
    pub fail_insert_into: Option<String>,
    pub fail_create: bool,
    pub healthy: bool,
    searches: Mutex<Vec<(String, SearchRequest)>>,
    inserts: Mutex<Vec<(String, Vec<DocumentChunk>, bool)>>,
    created: Mutex<Vec<(String, Vectorizer)>>,
}

impl FakeVectorStore {
    pub fn new(collections: &[&str], hits: Vec<SearchHit>) -> Self {
        Self {
            collections: Mutex::new(collections.iter().map(|c| c.to_string()).collect()),
            hits,
            healthy: true,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_search: true,
            ..Self::new(&["Document"], Vec::new())
        }
    }

    pub fn searches(&self) -> Vec<(String, SearchRequest)> {
        self.searches.lock().unwrap().clone()
    }

    /// (collection, chunks, had vectors)
    pub fn inserts(&self) -> Vec<(String, Vec<DocumentChunk>, bool)> {
        self.inserts.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, Vectorizer)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStoreProvider for FakeVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.lock().unwrap().clone())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.lock().unwrap().iter().any(|c| c == name))
    }

    async fn create_collection(&self, name: &str, vectorizer: &Vectorizer) -> Result<()> {
        if self.fail_create {
            return Err(Error::vector_db("schema update rejected"));
        }
        self.collections.lock().unwrap().push(name.to_string());
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), vectorizer.clone()));
        Ok(())
    }

    async fn insert_chunks(
        &self,
        collection: &str,
        chunks: &[DocumentChunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<usize> {
        if self.fail_insert_into.as_deref() == Some(collection) {
            return Err(Error::vector_db("batch insert rejected"));
        }
        self.inserts
            .lock()
            .unwrap()
            .push((collection.to_string(), chunks.to_vec(), vectors.is_some()));
        Ok(chunks.len())
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.searches
            .lock()
            .unwrap()
            .push((collection.to_string(), request.clone()));
        if self.fail_search {
            return Err(Error::vector_db("connection refused"));
        }
        Ok(self.hits.iter().take(request.limit).cloned().collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Embedder returning a constant vector of ones
pub struct FakeEmbedder {
    dimensions: usize,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; self.dimensions])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// LLM returning a fixed answer and recording prompts
#[derive(Default)]
pub struct FakeLlm {
    answer: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
    summaries: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.summaries.lock().unwrap().clone()
    }

    fn reply(&self) -> Result<String> {
        if self.fail {
            return Err(Error::llm("model is overloaded"));
        }
        Ok(self.answer.clone())
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn chat(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply()
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.summaries.lock().unwrap().push(text.to_string());
        self.reply()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
