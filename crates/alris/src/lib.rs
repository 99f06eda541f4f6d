//! ALRIS: document question answering over a Weaviate vector store
//!
//! Documents (PDF, Markdown, plain text) are split into overlapping chunks and
//! stored in a Weaviate collection. Questions are answered by retrieving the
//! closest chunks and handing them to a hosted Hugging Face model, which
//! either chats over the context or summarizes it.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod rag;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::AlrisConfig;
pub use error::{Error, Result};
pub use rag::RagService;
pub use types::{
    document::{DocumentChunk, FileType},
    query::{AskRequest, SearchMode},
    response::{AskResponse, CollectionsResponse, SearchHit},
};
