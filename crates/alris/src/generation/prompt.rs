//! Prompt templates for RAG generation

use crate::types::SearchHit;

/// System instruction for chat-mode answers
pub const SYSTEM_PROMPT: &str = "You are a document-grounded assistant. \
You answer questions using ONLY the context passages you are given. \
If the context does not contain the answer, say so plainly instead of guessing.";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from search hits
    pub fn build_context(hits: &[SearchHit]) -> String {
        let mut context = String::new();

        for (i, hit) in hits.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\n{}\n\n---\n\n",
                i + 1,
                hit.file_name,
                hit.content.trim()
            ));
        }

        context
    }

    /// Build the full RAG prompt with strict grounding
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Answer the question using ONLY the context below.

RULES:
1. Use only information that is explicitly stated in the context
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. Do not use outside knowledge or make assumptions
4. Mention the source file name when you rely on a passage

CONTEXT:
{context}
QUESTION: {question}

ANSWER:"#,
            context = context,
            question = question
        )
    }

    /// Text handed to the summarization model: the retrieved passages, in rank order
    pub fn build_summary_input(hits: &[SearchHit]) -> String {
        hits.iter()
            .map(|hit| hit.content.trim())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file_name: &str, content: &str) -> SearchHit {
        SearchHit {
            content: content.into(),
            file_name: file_name.into(),
            file_type: String::new(),
            chunk_id: None,
            distance: None,
            score: None,
        }
    }

    #[test]
    fn test_context_numbers_sources() {
        let context = PromptBuilder::build_context(&[
            hit("a.md", "Alpha text. "),
            hit("b.pdf", "Beta text."),
        ]);
        assert!(context.starts_with("[1] a.md\n\nAlpha text.\n\n---"));
        assert!(context.contains("[2] b.pdf\n\nBeta text."));
    }

    #[test]
    fn test_rag_prompt_contains_question_and_context() {
        let prompt = PromptBuilder::build_rag_prompt("What is ALRIS?", "[1] x.md\n\nctx");
        assert!(prompt.contains("QUESTION: What is ALRIS?"));
        assert!(prompt.contains("[1] x.md\n\nctx"));
        assert!(prompt.trim_end().ends_with("ANSWER:"));
    }

    #[test]
    fn test_summary_input_skips_blank_chunks() {
        let input = PromptBuilder::build_summary_input(&[hit("a", "one"), hit("b", "   "), hit("c", "two")]);
        assert_eq!(input, "one\n\ntwo");
    }
}
