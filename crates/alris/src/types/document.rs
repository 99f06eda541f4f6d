//! Document chunk and file type definitions

use serde::{Deserialize, Serialize};

/// File types the ingestion script understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Markdown file
    Markdown,
    /// Plain text file
    Txt,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension (without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::Txt,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_filename(filename: &str) -> Self {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Extension stored alongside chunks (`.pdf`, `.md`, `.txt`)
    pub fn as_extension(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Markdown => ".md",
            Self::Txt => ".txt",
            Self::Unknown => "",
        }
    }
}

/// A bounded substring of one source file, the unit of retrieval.
///
/// Serialized with the property names used in the vector store schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    /// Chunk text
    pub content: String,
    /// Base name of the source file
    pub file_name: String,
    /// Source file extension, e.g. `.pdf`
    #[serde(default)]
    pub file_type: String,
    /// Position of the chunk within its file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<u32>,
    /// SHA-256 of the extracted text of the whole source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl DocumentChunk {
    /// Create a chunk for a file
    pub fn new(content: impl Into<String>, file_name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            content: content.into(),
            file_name: file_name.into(),
            file_type: file_type.as_extension().to_string(),
            chunk_id: None,
            content_hash: None,
        }
    }

    /// Set the chunk index
    pub fn with_chunk_id(mut self, chunk_id: u32) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    /// Tag the chunk with the hash of its source text
    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = Some(content_hash.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("report.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("notes/readme.md"), FileType::Markdown);
        assert_eq!(FileType::from_filename("a.txt"), FileType::Txt);
        assert_eq!(FileType::from_filename("image.png"), FileType::Unknown);
        assert_eq!(FileType::from_filename("Makefile"), FileType::Unknown);
    }

    #[test]
    fn test_chunk_serializes_camel_case() {
        let chunk = DocumentChunk::new("hello", "a.md", FileType::Markdown).with_chunk_id(4);
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["fileName"], "a.md");
        assert_eq!(value["fileType"], ".md");
        assert_eq!(value["chunkId"], 4);
        assert!(value.get("contentHash").is_none());

        let value = serde_json::to_value(chunk.with_content_hash("ab12")).unwrap();
        assert_eq!(value["contentHash"], "ab12");
    }
}
