//! Query-side retrieval: embed the question, then search the vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Finds the documents most similar to a free-text query.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    default_k: usize,
}

impl Retriever {
    /// `default_k` is the number of documents [`Retriever::retrieve`] asks for.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        default_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            default_k,
        }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Top `k` documents for `query`, best match first.
    #[tracing::instrument(skip(self, query), fields(index = %self.index.name()))]
    pub async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RetrievalResult>> {
        if k == 0 {
            return Err(AppError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }

        let query_vector = self.embedder.embed(query).await?;
        let results = self.index.similarity_search(&query_vector, k)?;

        if !results.is_empty() {
            let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
            tracing::debug!("Retrieved {} documents - scores: {:?}", results.len(), scores);
        }

        Ok(results)
    }

    /// Search with the default `k`.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievalResult>> {
        self.search(query, self.default_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use crate::memory_index::MemoryIndex;
    use crate::types::Document;
    use crate::vector_index::SimilarityMetric;

    async fn retriever(texts: &[&str]) -> Retriever {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(256));
        let mut index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);

        let documents: Vec<Document> = texts.iter().map(|t| Document::new(*t)).collect();
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&owned).await.unwrap();
        index.upsert(&documents, &vectors).unwrap();

        Retriever::new(embedder, Box::new(index), 2)
    }

    #[tokio::test]
    async fn test_search_ranks_matching_text_first() {
        let retriever = retriever(&[
            "Gradle lint plugin dependency rules",
            "The sky is blue.",
            "Rust is a systems programming language",
        ])
        .await;

        let results = retriever.search("What color is the sky?", 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document.text, "The sky is blue.");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_retrieve_uses_default_k() {
        let retriever = retriever(&["alpha", "beta", "gamma"]).await;
        assert_eq!(retriever.retrieve("alpha").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let retriever = retriever(&["alpha"]).await;
        assert!(matches!(
            retriever.search("alpha", 0).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}
