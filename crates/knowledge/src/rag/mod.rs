//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Retrieves the documents closest to a question and has a language model
//! answer from them.

pub mod retriever;
pub mod service;
pub mod synthesizer;
pub mod types;

pub use retriever::Retriever;
pub use service::{
    IngestionOptions, IngestionService, LanguageModel, QueryService, RagService, ServiceMode,
};
pub use synthesizer::{AnswerSynthesizer, DEFAULT_TEMPERATURE};
pub use types::{RagAnswer, RagSourceRef};
