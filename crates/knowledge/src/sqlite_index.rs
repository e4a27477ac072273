//! SQLite-backed vector index.
//!
//! One database file holds any number of collections and indexes. Scoring is
//! a brute-force scan over the scoped rows.

use crate::types::{Document, Embedding, RetrievalResult};
use crate::vector_index::{
    rank, validate_search, validate_upsert, IndexMode, SimilarityMetric, VectorIndex,
};
use chrono::Utc;
use docqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vector_indexes (
        collection TEXT NOT NULL,
        name TEXT NOT NULL,
        metric TEXT NOT NULL,
        dimensions INTEGER,
        created_at TEXT NOT NULL,
        PRIMARY KEY (collection, name)
    );

    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        index_name TEXT NOT NULL,
        id TEXT NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        PRIMARY KEY (collection, index_name, id)
    );
"#;

/// Vector index stored in a SQLite database file.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    path: PathBuf,
    collection: String,
    name: String,
    metric: SimilarityMetric,
    dimensions: Option<usize>,
}

impl SqliteIndex {
    /// Open the index `name` in `collection` of the database at `db_path`.
    ///
    /// In [`IndexMode::Bind`] both the file and the index must exist and the
    /// stored metric is used. In [`IndexMode::Create`] missing pieces are
    /// created with `metric`.
    pub fn open(
        db_path: &Path,
        collection: &str,
        name: &str,
        mode: IndexMode,
        metric: SimilarityMetric,
    ) -> AppResult<Self> {
        match mode {
            IndexMode::Bind if !db_path.exists() => {
                return Err(AppError::Retrieval(format!(
                    "Vector index '{}' not found: database {:?} does not exist",
                    name, db_path
                )));
            }
            IndexMode::Bind => {}
            IndexMode::Create => {
                if let Some(parent) = db_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;
        conn.execute_batch(SCHEMA)?;

        let registered: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT metric, dimensions FROM vector_indexes WHERE collection = ?1 AND name = ?2",
                params![collection, name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (metric, dimensions) = match (registered, mode) {
            (Some((stored_metric, dimensions)), _) => {
                let stored: SimilarityMetric = stored_metric.parse()?;
                if stored != metric {
                    tracing::warn!(
                        "Index '{}' was created with metric {}, ignoring requested {}",
                        name,
                        stored,
                        metric
                    );
                }
                (stored, dimensions.map(|d| d as usize))
            }
            (None, IndexMode::Bind) => {
                return Err(AppError::Retrieval(format!(
                    "Vector index '{}' not found in collection '{}'",
                    name, collection
                )));
            }
            (None, IndexMode::Create) => {
                conn.execute(
                    "INSERT INTO vector_indexes (collection, name, metric, dimensions, created_at)
                     VALUES (?1, ?2, ?3, NULL, ?4)",
                    params![collection, name, metric.as_str(), Utc::now().to_rfc3339()],
                )?;
                tracing::info!(
                    "Created vector index '{}' in collection '{}' ({})",
                    name,
                    collection,
                    metric
                );
                (metric, None)
            }
        };

        tracing::debug!("Opened SQLite index at {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: db_path.to_path_buf(),
            collection: collection.to_string(),
            name: name.to_string(),
            metric,
            dimensions,
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Dimensionality recorded on first write.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("SQLite connection lock poisoned".to_string()))
    }

    fn insert_rows(
        &self,
        tx: &Transaction<'_>,
        documents: &[Document],
        vectors: &[Embedding],
    ) -> AppResult<()> {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO documents (collection, index_name, id, text, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (document, vector) in documents.iter().zip(vectors) {
            let metadata = serde_json::to_string(&document.metadata)?;
            stmt.execute(params![
                self.collection,
                self.name,
                document.id(),
                document.text,
                metadata,
                embedding_to_bytes(vector),
            ])?;
        }
        Ok(())
    }

    fn delete_rows(&self, tx: &Transaction<'_>) -> AppResult<()> {
        tx.execute(
            "DELETE FROM documents WHERE collection = ?1 AND index_name = ?2",
            params![self.collection, self.name],
        )?;
        Ok(())
    }

    fn record_dimensions(&self, tx: &Transaction<'_>, dimensions: Option<usize>) -> AppResult<()> {
        tx.execute(
            "UPDATE vector_indexes SET dimensions = ?1 WHERE collection = ?2 AND name = ?3",
            params![dimensions.map(|d| d as i64), self.collection, self.name],
        )?;
        Ok(())
    }
}

impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn upsert(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize> {
        let dimensions = validate_upsert(documents, vectors, self.dimensions)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.insert_rows(&tx, documents, vectors)?;
        if dimensions != self.dimensions {
            self.record_dimensions(&tx, dimensions)?;
        }
        tx.commit()?;
        drop(conn);

        self.dimensions = dimensions;

        tracing::debug!("Upserted {} documents into '{}'", documents.len(), self.name);
        Ok(documents.len())
    }

    fn similarity_search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievalResult>> {
        validate_search(query, k, self.dimensions)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT text, metadata, embedding FROM documents WHERE collection = ?1 AND index_name = ?2",
        )?;

        let rows = stmt.query_map(params![self.collection, self.name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut candidates = Vec::new();
        for row in rows {
            let (text, metadata, embedding) = row?;
            let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
                .map_err(|e| AppError::Retrieval(format!("Corrupt document metadata: {}", e)))?;
            candidates.push((Document { text, metadata }, bytes_to_embedding(&embedding)?));
        }

        let results = rank(self.metric, query, k, candidates);

        tracing::debug!(
            "Retrieved {} documents from '{}' (requested top-{})",
            results.len(),
            self.name,
            k
        );

        Ok(results)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND index_name = ?2",
            params![self.collection, self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn reset(&mut self) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.delete_rows(&tx)?;
        self.record_dimensions(&tx, None)?;
        tx.commit()?;
        drop(conn);

        self.dimensions = None;

        tracing::info!("Reset vector index '{}'", self.name);
        Ok(())
    }

    fn replace_all(&mut self, documents: &[Document], vectors: &[Embedding]) -> AppResult<usize> {
        let dimensions = validate_upsert(documents, vectors, None)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.delete_rows(&tx)?;
        self.insert_rows(&tx, documents, vectors)?;
        self.record_dimensions(&tx, dimensions)?;
        tx.commit()?;
        drop(conn);

        self.dimensions = dimensions;

        tracing::info!(
            "Replaced content of vector index '{}' with {} documents",
            self.name,
            documents.len()
        );
        Ok(documents.len())
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
