//! Configuration for ALRIS
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables (a `.env` file is honoured via `dotenvy`).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::query::SearchMode;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "alris.toml";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|v| v.parse().ok())
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlrisConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Weaviate vector database configuration
    pub weaviate: WeaviateConfig,
    /// Hugging Face inference configuration
    pub huggingface: HuggingFaceConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval and answer generation
    pub retrieval: RetrievalConfig,
    /// Ingestion script defaults
    pub ingest: IngestConfig,
}

impl AlrisConfig {
    /// Load configuration: TOML file (explicit path, else `alris.toml` if present),
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Some(host) = env_opt("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("PORT") {
            self.server.port = port;
        }
        if let Some(url) = env_opt("WEAVIATE_URL") {
            self.weaviate.url = url;
        }
        if let Some(key) = env_opt("WEAVIATE_API_KEY") {
            self.weaviate.api_key = Some(key);
        }
        if let Some(collection) = env_opt("ALRIS_COLLECTION") {
            self.weaviate.default_collection = collection;
        }
        if let Some(key) = env_opt("HUGGINGFACE_API_KEY") {
            self.huggingface.api_key = Some(key);
        }
        if let Some(model) = env_opt("HUGGINGFACE_CHAT_MODEL") {
            self.huggingface.chat_model = model;
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.weaviate.url.trim().is_empty() {
            return Err(Error::Config("weaviate.url must be set (WEAVIATE_URL)".into()));
        }
        if self.weaviate.default_collection.trim().is_empty() {
            return Err(Error::Config("weaviate.default_collection must not be empty".into()));
        }
        if self.weaviate.batch_size == 0 {
            return Err(Error::Config("weaviate.batch_size must be at least 1".into()));
        }
        if self.retrieval.limit == 0 {
            return Err(Error::Config("retrieval.limit must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.hybrid_alpha) {
            return Err(Error::Config("retrieval.hybrid_alpha must be within 0.0..=1.0".into()));
        }
        self.chunking.validate()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Directory with the static front end (served as fallback)
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            static_dir: Some(PathBuf::from("frontend")),
        }
    }
}

/// Weaviate connection and schema configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaviateConfig {
    /// Cluster URL, e.g. `https://my-cluster.weaviate.cloud`
    pub url: String,
    /// API key sent as bearer token
    pub api_key: Option<String>,
    /// Collection used when a request does not name one
    pub default_collection: String,
    /// Model used by the `text2vec-huggingface` module
    pub vectorizer_model: String,
    /// Compute embeddings here and store them with the objects instead of
    /// letting Weaviate vectorize
    pub client_side_vectors: bool,
    /// Connect timeout in seconds
    pub init_timeout_secs: u64,
    /// Request timeout in seconds
    pub query_timeout_secs: u64,
    /// Objects per batch insert
    pub batch_size: usize,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            api_key: None,
            default_collection: "Document".to_string(),
            vectorizer_model: "Snowflake/snowflake-arctic-embed-l-v2.0".to_string(),
            client_side_vectors: false,
            init_timeout_secs: 30,
            query_timeout_secs: 60,
            batch_size: 100,
        }
    }
}

/// Hugging Face inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    /// Access token
    pub api_key: Option<String>,
    /// Base URL for task pipelines (feature extraction, summarization)
    pub inference_url: String,
    /// Base URL of the OpenAI-compatible router (chat completions)
    pub router_url: String,
    /// Embedding model for client-side vectors
    pub embed_model: String,
    /// Summarization model
    pub summarization_model: String,
    /// Chat model for answer synthesis
    pub chat_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            inference_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            router_url: "https://router.huggingface.co/v1".to_string(),
            embed_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            summarization_model: "facebook/bart-large-cnn".to_string(),
            chat_model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Size must be positive and overlap strictly smaller than size
    pub fn validate(&self) -> Result<()> {
        crate::ingestion::chunker::check_params(self.chunk_size, self.chunk_overlap)
    }
}

/// How the retrieved context is turned into an answer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Chat completion with the question and context
    #[default]
    Chat,
    /// Summarize the retrieved context
    Summarize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve
    pub limit: usize,
    /// Default search mode
    pub mode: SearchMode,
    /// Keyword/vector balance for hybrid search (0 = pure keyword, 1 = pure vector)
    pub hybrid_alpha: f32,
    /// Answer synthesis mode
    pub answer_mode: AnswerMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            mode: SearchMode::NearText,
            hybrid_alpha: 0.5,
            answer_mode: AnswerMode::Chat,
        }
    }
}

/// Ingestion defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory scanned for documents
    pub data_dir: PathBuf,
    /// File extensions picked up (lowercase, without dot)
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extensions: vec!["pdf".into(), "md".into(), "txt".into()],
        }
    }
}
