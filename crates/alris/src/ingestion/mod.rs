//! Document ingestion: parsing, chunking and loading into the vector store

pub mod chunker;
pub mod parser;
pub mod pipeline;

pub use chunker::{chunk_text, TextChunker};
pub use parser::{FileParser, ParsedDocument};
pub use pipeline::{
    collection_name_for, CollectionTarget, FileFailure, IngestPipeline, IngestReport, Ingestor,
    ProcessedFile,
};
