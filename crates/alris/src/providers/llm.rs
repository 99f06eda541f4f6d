//! LLM provider trait for answer synthesis

use async_trait::async_trait;
use crate::error::Result;

/// Trait for hosted text generation
///
/// Implementations:
/// - `HuggingFaceClient`: chat completions + summarization pipeline
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Chat completion with a system instruction and a user prompt
    async fn chat(&self, system: &str, prompt: &str) -> Result<String>;

    /// Abstractive summary of a text
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the chat model being used
    fn model(&self) -> &str;
}
