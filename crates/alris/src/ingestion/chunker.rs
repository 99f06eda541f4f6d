//! Fixed-width text chunking with constant overlap
//!
//! Positions are counted in chars (Unicode scalar values), never bytes, so a
//! chunk boundary can not split a multi-byte character.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{DocumentChunk, FileType};

/// Validate a chunk size / overlap pair
pub fn check_params(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::Chunking("chunk size must be at least 1".into()));
    }
    if overlap >= chunk_size {
        return Err(Error::Chunking(format!(
            "overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Split `text` into chunks of `chunk_size` chars, chunk `i` starting at
/// `i * (chunk_size - overlap)`.
///
/// Stops at the first chunk that reaches the end of the text; that chunk may
/// be shorter than `chunk_size`. Empty text gives no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    check_params(chunk_size, overlap)?;
    Ok(split(text, chunk_size, chunk_size - overlap))
}

fn split(text: &str, chunk_size: usize, stride: usize) -> Vec<String> {
    // Byte offset of every char boundary, including the end of the text
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::with_capacity(char_len / stride + 1);
    let mut start = 0;
    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_len {
            break;
        }
        start += stride;
    }
    chunks
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Chunk size in chars
    chunk_size: usize,
    /// Overlap between consecutive chunks in chars
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        check_params(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split raw text
    pub fn chunk(&self, text: &str) -> Vec<String> {
        split(text, self.chunk_size, self.chunk_size - self.overlap)
    }

    /// Chunk the extracted text of one file into storable records
    pub fn chunk_file(&self, file_name: &str, file_type: FileType, text: &str) -> Vec<DocumentChunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| DocumentChunk::new(content, file_name, file_type).with_chunk_id(i as u32))
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}
