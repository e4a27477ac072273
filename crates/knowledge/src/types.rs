//! Document and retrieval types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Metadata key holding the path a document was loaded from.
pub const SOURCE_KEY: &str = "source";

/// Embedding vector; its length is fixed by the embedding provider.
pub type Embedding = Vec<f32>;

/// A text document with string metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Path the document was loaded from, if known.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// Stable identity: hex SHA-256 of the source, or of the text for
    /// documents without one.
    ///
    /// Re-ingesting a file yields the same id even after its content changed,
    /// so the vector indexes replace the old entry on upsert.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        match self.source() {
            Some(source) => {
                hasher.update(b"source\0");
                hasher.update(source.as_bytes());
            }
            None => {
                hasher.update(b"text\0");
                hasher.update(self.text.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// A document paired with its similarity to a query. Higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub document: Document,
    pub score: f32,
}

impl RetrievalResult {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Unique id of the run, for log correlation
    pub run_id: String,

    pub index_name: String,

    /// Documents read from the data directory
    pub documents_loaded: usize,

    /// Documents written to the index
    pub documents_written: usize,

    pub duration_secs: f64,
}
