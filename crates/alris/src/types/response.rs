//! Response types

use serde::{Deserialize, Serialize};

/// Answer returned by `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskResponse {
    /// Synthesized answer
    pub answer: String,
    /// Source file names, deduplicated, in retrieval order
    pub sources: Vec<String>,
}

impl AskResponse {
    /// Answer given when retrieval finds nothing
    pub const NOT_FOUND_ANSWER: &'static str =
        "I couldn't find relevant information in the documents to answer this question.";

    /// Build a response, deduplicating the source names
    pub fn new(answer: impl Into<String>, hits: &[SearchHit]) -> Self {
        Self {
            answer: answer.into(),
            sources: dedup_sources(hits),
        }
    }

    /// Response for a query with no retrieved context
    pub fn not_found() -> Self {
        Self {
            answer: Self::NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Source file names of the hits, first occurrence wins
pub fn dedup_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    hits.iter()
        .filter(|hit| seen.insert(hit.file_name.as_str()))
        .map(|hit| hit.file_name.clone())
        .collect()
}

/// A retrieved chunk with its ranking metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Chunk text
    pub content: String,
    /// Source file name
    pub file_name: String,
    /// Source file extension
    #[serde(default)]
    pub file_type: String,
    /// Chunk index within the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<u32>,
    /// Vector distance (near-text / near-vector searches)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// Fused relevance score (hybrid searches)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Body of `GET /collections`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionsResponse {
    /// Collection names
    pub collections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file_name: &str) -> SearchHit {
        SearchHit {
            content: "text".into(),
            file_name: file_name.into(),
            file_type: ".md".into(),
            chunk_id: None,
            distance: None,
            score: None,
        }
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let hits = vec![hit("b.md"), hit("a.pdf"), hit("b.md"), hit("c.txt"), hit("a.pdf")];
        let response = AskResponse::new("answer", &hits);
        assert_eq!(response.sources, vec!["b.md", "a.pdf", "c.txt"]);
    }

    #[test]
    fn test_not_found_has_no_sources() {
        let response = AskResponse::not_found();
        assert!(response.sources.is_empty());
        assert_eq!(response.answer, AskResponse::NOT_FOUND_ANSWER);
    }
}
