//! Core types shared by ingestion, retrieval and the HTTP layer

pub mod document;
pub mod query;
pub mod response;

pub use document::{DocumentChunk, FileType};
pub use query::{AskRequest, SearchMode};
pub use response::{AskResponse, CollectionsResponse, SearchHit};
