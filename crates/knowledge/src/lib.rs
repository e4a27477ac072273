//! Document question answering over a vector index.
//!
//! Ingestion loads a directory of text files, embeds them and writes them to
//! a vector index. Querying embeds a question, retrieves the closest
//! documents and has a language model answer from them.

pub mod embeddings;
pub mod loader;
pub mod memory_index;
pub mod rag;
pub mod sqlite_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use loader::DirectoryLoader;
pub use memory_index::MemoryIndex;
pub use rag::{
    AnswerSynthesizer, IngestionOptions, IngestionService, LanguageModel, QueryService, RagAnswer,
    RagService, Retriever, ServiceMode,
};
pub use sqlite_index::SqliteIndex;
pub use types::{Document, Embedding, IngestionReport, RetrievalResult};
pub use vector_index::{open_index, IndexMode, SimilarityMetric, VectorIndex};
