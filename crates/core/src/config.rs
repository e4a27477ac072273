//! Configuration management for docqa.
//!
//! Two layers:
//! - [`RagConfig`]: the five values that identify *where* documents live and
//!   *who* may embed them (index, database, collection, credential, storage
//!   URI). Built once, never mutated, passed explicitly to every component.
//! - [`AppConfig`]: runtime settings (providers, models, retrieval depth,
//!   logging). Merged from defaults, `.docqa/config.yaml`, environment
//!   variables and command-line flags, in that order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

pub const ENV_INDEX_NAME: &str = "DOCQA_INDEX_NAME";
pub const ENV_DB_NAME: &str = "DOCQA_DB_NAME";
pub const ENV_COLLECTION_NAME: &str = "DOCQA_COLLECTION_NAME";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_STORAGE_URI: &str = "DOCQA_STORAGE_URI";

const DEFAULT_INDEX_NAME: &str = "openai_idx";
const DEFAULT_DB_NAME: &str = "langchain_demo";
const DEFAULT_COLLECTION_NAME: &str = "collection_of_blobs";

/// Immutable target configuration for the retrieval-augmented workflow.
#[derive(Clone, PartialEq, Eq)]
pub struct RagConfig {
    index_name: String,
    db_name: String,
    collection_name: String,
    api_key: String,
    storage_uri: String,
}

impl RagConfig {
    /// Build a configuration, rejecting blank fields.
    pub fn new(
        index_name: impl Into<String>,
        db_name: impl Into<String>,
        collection_name: impl Into<String>,
        api_key: impl Into<String>,
        storage_uri: impl Into<String>,
    ) -> AppResult<Self> {
        let config = Self {
            index_name: index_name.into(),
            db_name: db_name.into(),
            collection_name: collection_name.into(),
            api_key: api_key.into(),
            storage_uri: storage_uri.into(),
        };

        for (field, value) in [
            ("index name", &config.index_name),
            ("database name", &config.db_name),
            ("collection name", &config.collection_name),
            ("embedding-service credential", &config.api_key),
            ("storage connection string", &config.storage_uri),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} must not be empty", field)));
            }
        }

        Ok(config)
    }

    /// Read the configuration from process environment variables.
    ///
    /// - `DOCQA_INDEX_NAME` (default `openai_idx`)
    /// - `DOCQA_DB_NAME` (default `langchain_demo`)
    /// - `DOCQA_COLLECTION_NAME` (default `collection_of_blobs`)
    /// - `OPENAI_API_KEY` (required)
    /// - `DOCQA_STORAGE_URI` (required)
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RagConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                AppError::Config(format!("Missing required environment variable {}", key))
            })
        };

        Self::new(
            lookup(ENV_INDEX_NAME).unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            lookup(ENV_DB_NAME).unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            lookup(ENV_COLLECTION_NAME).unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            required(ENV_API_KEY)?,
            required(ENV_STORAGE_URI)?,
        )
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Credential for the embedding (and generation) service.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn storage_uri(&self) -> &str {
        &self.storage_uri
    }
}

impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("index_name", &self.index_name)
            .field("db_name", &self.db_name)
            .field("collection_name", &self.collection_name)
            .field("api_key", &"<redacted>")
            .field("storage_uri", &self.storage_uri)
            .finish()
    }
}

/// Generative model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// "openai" or "mock"
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            temperature: 0.5,
            max_tokens: 256,
            timeout: 60,
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "openai" or "mock"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: String,
    pub timeout: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            endpoint: "https://api.openai.com".to_string(),
            timeout: 60,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Number of documents stuffed into the prompt
    pub top_k: usize,
    /// "cosine", "dotProduct" or "euclidean"
    pub metric: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            metric: "cosine".to_string(),
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestSettings {
    pub data_dir: PathBuf,
    /// File extension (without the dot) of documents to load
    pub extension: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extension: "txt".to_string(),
        }
    }
}

/// Runtime settings shared by the CLI and the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains `.docqa/`)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,

    /// Optional YAML prompt template replacing the built-in stuff prompt
    pub prompt_file: Option<PathBuf>,
}

/// Layout of `.docqa/config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    ingest: Option<IngestSettings>,
    prompt: Option<PromptFileConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptFileConfig {
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            ingest: IngestSettings::default(),
            prompt_file: None,
        }
    }
}

impl AppConfig {
    /// Load settings from the config file and environment.
    ///
    /// Environment variables:
    /// - `DOCQA_WORKSPACE`, `DOCQA_CONFIG`
    /// - `DOCQA_LLM_PROVIDER`, `DOCQA_LLM_MODEL`
    /// - `DOCQA_EMBEDDING_PROVIDER`, `DOCQA_EMBEDDING_MODEL`
    /// - `DOCQA_ENDPOINT` (both services)
    /// - `DOCQA_DATA_DIR`, `DOCQA_TOP_K`
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable variable source.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = lookup("DOCQA_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = lookup("DOCQA_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docqa_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env(&lookup)?;

        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("DOCQA_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("DOCQA_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = lookup("DOCQA_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(endpoint) = lookup("DOCQA_ENDPOINT") {
            self.llm.endpoint = endpoint.clone();
            self.embedding.endpoint = endpoint;
        }
        if let Some(data_dir) = lookup("DOCQA_DATA_DIR") {
            self.ingest.data_dir = PathBuf::from(data_dir);
        }
        if let Some(top_k) = lookup("DOCQA_TOP_K") {
            self.retrieval.top_k = top_k.parse().map_err(|_| {
                AppError::Config(format!("DOCQA_TOP_K must be a positive integer, got '{}'", top_k))
            })?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);

        let mut result = self.clone();

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(ingest) = file.ingest {
            result.ingest = ingest;
        }
        if let Some(prompt) = file.prompt {
            result.prompt_file = prompt.file;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the `.docqa` directory.
    pub fn docqa_dir(&self) -> PathBuf {
        self.workspace.join(".docqa")
    }

    /// Resolve a possibly relative path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Data directory for ingestion, resolved against the workspace.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve_path(&self.ingest.data_dir)
    }

    /// Validate settings before any client is built.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "mock"];

        for (kind, provider) in [
            ("LLM", &self.llm.provider),
            ("embedding", &self.embedding.provider),
        ] {
            if !known_providers.contains(&provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown {} provider: {}. Supported: {}",
                    kind,
                    provider,
                    known_providers.join(", ")
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be within 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be at least 1".to_string(),
            ));
        }

        if self.llm.timeout == 0 || self.embedding.timeout == 0 {
            return Err(AppError::Config("Timeouts must be at least 1 second".to_string()));
        }

        Ok(())
    }
}
