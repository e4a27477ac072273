//! In-process vector index.

use crate::types::{Document, Embedding, RetrievalResult};
use crate::vector_index::{
    rank, validate_search, validate_upsert, IndexMode, SimilarityMetric, VectorIndex,
};
use docqa_core::{AppError, AppResult};
use std::collections::BTreeMap;

/// Vector index held in memory for the lifetime of the value.
///
/// Used for tests and one-shot runs; nothing is persisted.
#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    metric: SimilarityMetric,
    dimensions: Option<usize>,
    entries: BTreeMap<String, (Document, Embedding)>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>, metric: SimilarityMetric) -> Self {
        Self {
            name: name.into(),
            metric,
            dimensions: None,
            entries: BTreeMap::new(),
        }
    }

    /// Open a fresh in-memory index.
    ///
    /// A new memory store never holds an existing index, so
    /// [`IndexMode::Bind`] always fails.
    pub fn open(name: &str, mode: IndexMode, metric: SimilarityMetric) -> AppResult<Self> {
        match mode {
            IndexMode::Create => Ok(Self::new(name, metric)),
            IndexMode::Bind => Err(AppError::Retrieval(format!(
                "Vector index '{}' not found: memory storage starts empty",
                name
            ))),
        }
    }
}

impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn upsert(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize> {
        self.dimensions = validate_upsert(documents, vectors, self.dimensions)?;

        for (document, vector) in documents.iter().zip(vectors) {
            self.entries
                .insert(document.id(), (document.clone(), vector.clone()));
        }

        Ok(documents.len())
    }

    fn similarity_search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievalResult>> {
        validate_search(query, k, self.dimensions)?;
        Ok(rank(self.metric, query, k, self.entries.values().cloned()))
    }

    fn count(&self) -> AppResult<usize> {
        Ok(self.entries.len())
    }

    fn reset(&mut self) -> AppResult<()> {
        self.entries.clear();
        self.dimensions = None;
        Ok(())
    }

    fn replace_all(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize> {
        let dimensions = validate_upsert(documents, vectors, None)?;

        self.entries = documents
            .iter()
            .zip(vectors)
            .map(|(document, vector)| (document.id(), (document.clone(), vector.clone())))
            .collect();
        self.dimensions = dimensions;

        Ok(documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_fails() {
        assert!(matches!(
            MemoryIndex::open("idx1", IndexMode::Bind, SimilarityMetric::Cosine),
            Err(AppError::Retrieval(_))
        ));
    }

    #[test]
    fn test_upsert_and_search() {
        let mut index = MemoryIndex::open("idx1", IndexMode::Create, SimilarityMetric::Cosine).unwrap();
        index
            .upsert(
                &[Document::new("alpha"), Document::new("beta")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let results = index.similarity_search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.text, "beta");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        let docs = [Document::new("alpha")];

        index.upsert(&docs, &[vec![1.0, 0.0]]).unwrap();
        index.upsert(&docs, &[vec![1.0, 0.0]]).unwrap();

        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        assert!(index.similarity_search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        assert!(matches!(
            index.similarity_search(&[1.0], 0),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        index.upsert(&[Document::new("alpha")], &[vec![1.0, 0.0]]).unwrap();
        index.reset().unwrap();

        assert_eq!(index.count().unwrap(), 0);
        index.upsert(&[Document::new("alpha")], &[vec![1.0, 0.0, 0.0]]).unwrap();
    }

    #[test]
    fn test_replace_all() {
        let mut index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        index
            .upsert(
                &[Document::new("alpha"), Document::new("beta")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let written = index
            .replace_all(&[Document::new("gamma")], &[vec![1.0, 0.0, 0.0]])
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(index.count().unwrap(), 1);
        let results = index.similarity_search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results[0].document.text, "gamma");
    }

    #[test]
    fn test_replace_all_rejected_keeps_content() {
        let mut index = MemoryIndex::new("idx1", SimilarityMetric::Cosine);
        index.upsert(&[Document::new("alpha")], &[vec![1.0, 0.0]]).unwrap();

        let result = index.replace_all(&[Document::new("beta")], &[]);

        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
        assert_eq!(index.count().unwrap(), 1);
        assert!(index.similarity_search(&[1.0, 0.0], 1).is_ok());
    }
}
