//! Hugging Face inference client
//!
//! Embeddings and summaries go through the task pipelines on the
//! inference endpoint; answers go through the OpenAI-compatible chat router.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::HuggingFaceConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::LlmProvider;

/// Longest text (in chars) sent to the summarization model
const SUMMARY_INPUT_CHARS: usize = 4000;

/// Hugging Face inference API client
pub struct HuggingFaceClient {
    client: Client,
    config: HuggingFaceConfig,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// Sentence-transformer models return one vector per input; raw encoders
/// return one vector per token which we mean-pool.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Pooled(Vec<Vec<f32>>),
    PerToken(Vec<Vec<Vec<f32>>>),
}

#[derive(Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: SummarizationParameters,
}

#[derive(Serialize)]
struct SummarizationParameters {
    max_length: u32,
    do_sample: bool,
}

#[derive(Deserialize)]
struct Summary {
    summary_text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HuggingFaceClient {
    /// Create a new client
    pub fn new(config: &HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn pipeline_url(&self, model: &str, task: Option<&str>) -> String {
        let base = self.config.inference_url.trim_end_matches('/');
        match task {
            Some(task) => format!("{}/{}/pipeline/{}", base, model, task),
            None => format!("{}/{}", base, model),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.router_url.trim_end_matches('/'))
    }

    /// Turn a non-2xx response into a message with the status and the API's error text
    async fn error_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| match &v["error"] {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(o) => o.get("message").and_then(|m| m.as_str()).map(String::from),
                _ => None,
            })
            .unwrap_or(body);
        format!("{}: {}", status, detail)
    }
}

/// Average token vectors into one sentence vector
fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = tokens.first() else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; first.len()];
    for token in tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    pooled
}

impl FeatureExtractionResponse {
    fn into_vectors(self) -> Vec<Vec<f32>> {
        match self {
            Self::Pooled(vectors) => vectors,
            Self::PerToken(inputs) => inputs.iter().map(|tokens| mean_pool(tokens)).collect(),
        }
    }
}

/// Cut text to at most `max_chars` chars on a char boundary
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.pipeline_url(&self.config.embed_model, Some("feature-extraction"));
        let response = self
            .authorized(self.client.post(&url))
            .json(&FeatureExtractionRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "Embedding with {} failed ({})",
                self.config.embed_model,
                Self::error_message(response).await
            )));
        }

        let vectors = response
            .json::<FeatureExtractionResponse>()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?
            .into_vectors();

        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.api_key.is_some())
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceClient {
    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let response = self
            .authorized(self.client.post(self.chat_url()))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::llm(format!(
                "Chat completion with {} failed ({})",
                self.config.chat_model,
                Self::error_message(response).await
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::llm("No text in chat response"))
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let request = SummarizationRequest {
            inputs: truncate_chars(text, SUMMARY_INPUT_CHARS),
            parameters: SummarizationParameters {
                max_length: self.config.max_tokens,
                do_sample: false,
            },
        };

        let url = self.pipeline_url(&self.config.summarization_model, None);
        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Summarization request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::llm(format!(
                "Summarization with {} failed ({})",
                self.config.summarization_model,
                Self::error_message(response).await
            )));
        }

        let summaries: Vec<Summary> = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse summarization response: {}", e)))?;

        summaries
            .into_iter()
            .next()
            .map(|s| s.summary_text.trim().to_string())
            .ok_or_else(|| Error::llm("No summary in response"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.api_key.is_some())
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}
