//! Embedding providers.
//!
//! Turn text into fixed-length vectors. The OpenAI provider calls the hosted
//! embeddings API; the mock provider hashes words locally and is fully
//! deterministic.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OpenAiProvider};
