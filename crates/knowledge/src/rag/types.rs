//! RAG response types.

use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};

/// Maximum snippet length for source references.
const MAX_SNIPPET_LENGTH: usize = 150;

/// A single source reference used to answer a query.
///
/// This is the user-facing representation of where information came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Source file path, or "unknown" when the document carries none
    pub source: String,

    /// Short snippet of the document text (truncated if needed)
    pub snippet: String,

    /// Similarity to the query
    pub score: f32,
}

impl From<&RetrievalResult> for RagSourceRef {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            source: result
                .document
                .source()
                .unwrap_or("unknown")
                .to_string(),
            snippet: truncate_snippet(&result.document.text),
            score: result.score,
        }
    }
}

/// Answer plus the scored documents it was generated from.
///
/// Callers can compare the answer against `sources` to spot answers the
/// context does not support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Model output with surrounding whitespace removed
    pub answer: String,

    /// Context documents, best match first
    pub sources: Vec<RetrievalResult>,
}

impl RagAnswer {
    pub fn new(answer: String, sources: Vec<RetrievalResult>) -> Self {
        Self { answer, sources }
    }

    /// Score of the best matching context document.
    pub fn top_score(&self) -> Option<f32> {
        self.sources.first().map(|r| r.score)
    }

    /// Human-readable references for every context document.
    pub fn source_refs(&self) -> Vec<RagSourceRef> {
        self.sources.iter().map(RagSourceRef::from).collect()
    }
}

fn truncate_snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_SNIPPET_LENGTH {
        return text.to_string();
    }

    let truncated: String = text.chars().take(MAX_SNIPPET_LENGTH).collect();
    format!("{}...", truncated.trim_end())
}
