//! Vector index abstraction.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval, plus
//! the similarity metrics and the storage connection string parsing shared by
//! every backend.

use crate::memory_index::MemoryIndex;
use crate::sqlite_index::SqliteIndex;
use crate::types::{Document, Embedding, RetrievalResult};
use docqa_core::{AppError, AppResult, RagConfig};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Connection string selecting the in-process backend.
pub const MEMORY_URI: &str = "memory://";

const SQLITE_SCHEME: &str = "sqlite://";

/// How scores are computed. Every metric maps to "larger is closer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    DotProduct,
    /// Scored as `1 / (1 + distance)`
    Euclidean,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::DotProduct => "dot_product",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }

    /// Similarity of two equal-length vectors.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            SimilarityMetric::Euclidean => {
                let distance = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + distance)
            }
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "dot_product" | "dotproduct" | "dot" => Ok(SimilarityMetric::DotProduct),
            "euclidean" | "l2" => Ok(SimilarityMetric::Euclidean),
            other => Err(AppError::Config(format!(
                "Unknown similarity metric: '{}'. Supported metrics: cosine, dot_product, euclidean",
                other
            ))),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether opening an index may create it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// The index must already exist
    Bind,
    /// Create the index if it is missing
    Create,
}

/// Trait for vector index backends.
///
/// An index is scoped by database, collection and name; implementations hold
/// (document, vector) pairs keyed by [`Document::id`].
pub trait VectorIndex: Send + Sync {
    /// Index name
    fn name(&self) -> &str;

    fn metric(&self) -> SimilarityMetric;

    /// Insert or replace documents with their vectors.
    ///
    /// `documents[i]` is stored with `vectors[i]`. Returns the number of
    /// documents written.
    fn upsert(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize>;

    /// Search for the `k` documents most similar to the query vector.
    ///
    /// Returns at most `k` results ordered by descending score.
    fn similarity_search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievalResult>>;

    /// Number of documents in the index.
    fn count(&self) -> AppResult<usize>;

    /// Remove every document from the index.
    fn reset(&mut self) -> AppResult<()>;

    /// Replace the whole content of the index with `documents`.
    ///
    /// Either every existing document is replaced or, on error, the index is
    /// left as it was. The dimensionality is taken from `vectors`.
    fn replace_all(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize>;
}

/// Open the index named by `config` on the backend its storage URI selects.
///
/// - `memory://` opens a [`MemoryIndex`]
/// - `sqlite://<dir>` or a plain path opens a [`SqliteIndex`] at
///   `<dir>/<db_name>.db`
pub fn open_index(
    config: &RagConfig,
    mode: IndexMode,
    metric: SimilarityMetric,
) -> AppResult<Box<dyn VectorIndex>> {
    match parse_storage_uri(config.storage_uri())? {
        StorageLocation::Memory => Ok(Box::new(MemoryIndex::open(
            config.index_name(),
            mode,
            metric,
        )?)),
        StorageLocation::Sqlite(dir) => {
            let path = dir.join(format!("{}.db", config.db_name()));
            Ok(Box::new(SqliteIndex::open(
                &path,
                config.collection_name(),
                config.index_name(),
                mode,
                metric,
            )?))
        }
    }
}

#[derive(Debug, PartialEq)]
enum StorageLocation {
    Memory,
    Sqlite(PathBuf),
}

fn parse_storage_uri(uri: &str) -> AppResult<StorageLocation> {
    let uri = uri.trim();

    if uri == MEMORY_URI {
        return Ok(StorageLocation::Memory);
    }

    let dir = match uri.strip_prefix(SQLITE_SCHEME) {
        Some(rest) => rest,
        None if uri.contains("://") => {
            return Err(AppError::Config(format!(
                "Unsupported storage URI '{}'. Use memory://, sqlite://<dir> or a directory path",
                uri
            )))
        }
        None => uri,
    };

    if dir.is_empty() {
        return Err(AppError::Config(format!(
            "Storage URI '{}' does not name a directory",
            uri
        )));
    }

    Ok(StorageLocation::Sqlite(PathBuf::from(dir)))
}

/// Check a bulk write and return the dimensionality of its vectors.
///
/// `expected` is the dimensionality already recorded for the index, if any.
pub(crate) fn validate_upsert(
    documents: &[Document],
    vectors: &[Embedding],
    expected: Option<usize>,
) -> AppResult<Option<usize>> {
    if documents.len() != vectors.len() {
        return Err(AppError::InvalidArgument(format!(
            "Got {} documents but {} vectors",
            documents.len(),
            vectors.len()
        )));
    }

    let mut dimensions = expected;
    for (i, vector) in vectors.iter().enumerate() {
        if vector.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "Vector {} is empty",
                i
            )));
        }
        match dimensions {
            Some(d) if d != vector.len() => {
                return Err(AppError::InvalidArgument(format!(
                    "Vector {} has {} dimensions, index expects {}",
                    i,
                    vector.len(),
                    d
                )))
            }
            Some(_) => {}
            None => dimensions = Some(vector.len()),
        }
    }

    Ok(dimensions)
}

/// Check search arguments against the index dimensionality.
pub(crate) fn validate_search(query: &[f32], k: usize, dimensions: Option<usize>) -> AppResult<()> {
    if k == 0 {
        return Err(AppError::InvalidArgument(
            "k must be at least 1".to_string(),
        ));
    }

    match dimensions {
        Some(d) if d != query.len() => Err(AppError::InvalidArgument(format!(
            "Query vector has {} dimensions, index expects {}",
            query.len(),
            d
        ))),
        _ => Ok(()),
    }
}

/// Score every candidate against the query and keep the top `k`.
pub(crate) fn rank<I>(
    metric: SimilarityMetric,
    query: &[f32],
    k: usize,
    candidates: I,
) -> Vec<RetrievalResult>
where
    I: IntoIterator<Item = (Document, Embedding)>,
{
    let mut results: Vec<RetrievalResult> = candidates
        .into_iter()
        .map(|(document, vector)| {
            let score = metric.score(query, &vector);
            RetrievalResult::new(document, score)
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);
    results
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
