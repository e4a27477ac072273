//! RAG services.
//!
//! A service is built either for ingestion or for querying and keeps that
//! role for its whole lifetime:
//! - [`IngestionService`] loads a directory, embeds it and writes the index
//!   while it is constructed
//! - [`QueryService`] binds to an existing index and answers questions
//! - [`RagService`] picks one of the two from an `ingestion_mode` flag
//!
//! Query operations live on the [`LanguageModel`] trait. `IngestionService`
//! does not implement it; `RagService` does and reports
//! [`AppError::InvalidMode`] for its ingestion variant.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::loader::DirectoryLoader;
use crate::rag::retriever::Retriever;
use crate::rag::synthesizer::AnswerSynthesizer;
use crate::rag::types::RagAnswer;
use crate::types::{Document, Embedding, IngestionReport};
use crate::vector_index::{open_index, IndexMode, SimilarityMetric, VectorIndex};
use async_trait::async_trait;
use docqa_core::{AppConfig, AppError, AppResult, RagConfig};
use docqa_llm::create_client;
use docqa_prompt::load_prompt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Role a service was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Ingestion,
    Query,
}

/// Query operations of a RAG service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Embedding vector for `text`.
    async fn tokenize(&self, text: &str) -> AppResult<Embedding>;

    /// Answer `query` from the indexed documents, trimmed.
    async fn answer(&self, query: &str) -> AppResult<String>;
}

/// Where and what to ingest.
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub data_dir: PathBuf,

    /// File extension without the dot
    pub extension: String,

    /// Replace the index content instead of adding to it
    pub reset: bool,
}

impl IngestionOptions {
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            data_dir: app.data_dir(),
            extension: app.ingest.extension.clone(),
            reset: false,
        }
    }
}

/// A completed ingestion run and the index it populated.
pub struct IngestionService {
    config: RagConfig,
    index: Box<dyn VectorIndex>,
    report: IngestionReport,
}

impl IngestionService {
    /// Load, embed and write every document under `options.data_dir`.
    ///
    /// All documents are embedded in one batch and written in one upsert.
    /// With `options.reset` the write replaces the whole index; nothing is
    /// removed unless embedding succeeded.
    pub async fn run(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        options: &IngestionOptions,
    ) -> AppResult<Self> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("ingest", run_id = %run_id, index = %index.name());

        Self::ingest(config, embedder, index, options, run_id)
            .instrument(span)
            .await
    }

    async fn ingest(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        mut index: Box<dyn VectorIndex>,
        options: &IngestionOptions,
        run_id: String,
    ) -> AppResult<Self> {
        let start = Instant::now();

        tracing::info!(
            "Starting ingestion from {:?} into '{}' (collection '{}', database '{}')",
            options.data_dir,
            index.name(),
            config.collection_name(),
            config.db_name()
        );

        let documents = DirectoryLoader::new(&options.data_dir, &options.extension).load()?;
        if documents.is_empty() {
            tracing::warn!(
                "No .{} documents found in {:?}",
                options.extension,
                options.data_dir
            );
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        let written = if options.reset {
            index.replace_all(&documents, &vectors)?
        } else {
            index.upsert(&documents, &vectors)?
        };

        let report = IngestionReport {
            run_id,
            index_name: index.name().to_string(),
            documents_loaded: documents.len(),
            documents_written: written,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Ingestion completed: {} documents loaded, {} written in {:.2}s",
            report.documents_loaded,
            report.documents_written,
            report.duration_secs
        );

        Ok(Self {
            config,
            index,
            report,
        })
    }

    /// Build the embedder and open the index (creating it if missing) from
    /// runtime settings, then run the ingestion.
    pub async fn from_app_config(
        config: RagConfig,
        app: &AppConfig,
        options: &IngestionOptions,
    ) -> AppResult<Self> {
        let embedder = create_provider(&app.embedding, config.api_key())?;
        let metric: SimilarityMetric = app.retrieval.metric.parse()?;
        let index = open_index(&config, IndexMode::Create, metric)?;

        Self::run(config, embedder, index, options).await
    }

    pub fn report(&self) -> &IngestionReport {
        &self.report
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }
}

/// Answers questions from an existing index.
pub struct QueryService {
    config: RagConfig,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl QueryService {
    pub fn new(config: RagConfig, retriever: Retriever, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            config,
            retriever,
            synthesizer,
        }
    }

    /// Bind to the configured index and build the model clients from
    /// runtime settings.
    ///
    /// # Errors
    /// `AppError::Retrieval` if the index does not exist.
    pub fn from_app_config(config: RagConfig, app: &AppConfig) -> AppResult<Self> {
        let metric: SimilarityMetric = app.retrieval.metric.parse()?;
        let index = open_index(&config, IndexMode::Bind, metric)?;
        let embedder = create_provider(&app.embedding, config.api_key())?;
        let retriever = Retriever::new(embedder, index, app.retrieval.top_k);

        let client = create_client(&app.llm, config.api_key())?;
        let mut synthesizer = AnswerSynthesizer::from_settings(client, &app.llm);
        if let Some(prompt_file) = &app.prompt_file {
            synthesizer = synthesizer.with_prompt(load_prompt(&app.resolve_path(prompt_file))?);
        }

        Ok(Self::new(config, retriever, synthesizer))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer `query` and return the context documents used.
    #[tracing::instrument(skip(self))]
    pub async fn answer_with_sources(&self, query: &str) -> AppResult<RagAnswer> {
        let results = self.retriever.retrieve(query).await?;

        let Some(top) = results.first() else {
            return Err(AppError::Retrieval(format!(
                "No documents found in index '{}'",
                self.retriever.index().name()
            )));
        };

        tracing::info!(
            "Top match (score {:.3}) from {}: {}",
            top.score,
            top.document.source().unwrap_or("unknown source"),
            top.document.text.lines().next().unwrap_or_default()
        );

        let documents: Vec<Document> = results.iter().map(|r| r.document.clone()).collect();
        let raw = self.synthesizer.synthesize(query, &documents).await?;

        Ok(RagAnswer::new(raw.trim().to_string(), results))
    }
}

#[async_trait]
impl LanguageModel for QueryService {
    async fn tokenize(&self, text: &str) -> AppResult<Embedding> {
        self.retriever.embedder().embed(text).await
    }

    async fn answer(&self, query: &str) -> AppResult<String> {
        Ok(self.answer_with_sources(query).await?.answer)
    }
}

/// A RAG service built for exactly one role.
pub enum RagService {
    Ingestion(IngestionService),
    Query(QueryService),
}

impl RagService {
    /// With `ingestion_mode` the data directory is ingested before this
    /// returns; otherwise the service binds to the existing index.
    pub async fn new(config: RagConfig, ingestion_mode: bool, app: &AppConfig) -> AppResult<Self> {
        if ingestion_mode {
            let options = IngestionOptions::from_app_config(app);
            Ok(RagService::Ingestion(
                IngestionService::from_app_config(config, app, &options).await?,
            ))
        } else {
            Ok(RagService::Query(QueryService::from_app_config(config, app)?))
        }
    }

    pub fn mode(&self) -> ServiceMode {
        match self {
            RagService::Ingestion(_) => ServiceMode::Ingestion,
            RagService::Query(_) => ServiceMode::Query,
        }
    }

    pub fn config(&self) -> &RagConfig {
        match self {
            RagService::Ingestion(service) => service.config(),
            RagService::Query(service) => service.config(),
        }
    }

    /// Same as [`QueryService::answer_with_sources`].
    pub async fn answer_with_sources(&self, query: &str) -> AppResult<RagAnswer> {
        self.query_service()?.answer_with_sources(query).await
    }

    fn query_service(&self) -> AppResult<&QueryService> {
        match self {
            RagService::Query(service) => Ok(service),
            RagService::Ingestion(_) => Err(AppError::InvalidMode(
                "service was built for ingestion; create one with ingestion_mode = false to query"
                    .to_string(),
            )),
        }
    }
}

#[async_trait]
impl LanguageModel for RagService {
    async fn tokenize(&self, text: &str) -> AppResult<Embedding> {
        self.query_service()?.tokenize(text).await
    }

    async fn answer(&self, query: &str) -> AppResult<String> {
        self.query_service()?.answer(query).await
    }
}
