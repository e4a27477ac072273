//! OpenAI Embedding Provider
//!
//! Calls `POST {endpoint}/v1/embeddings` with batched string input.
//!
//! # Features
//! - Batched requests (up to [`MAX_BATCH_SIZE`] texts per call)
//! - Dimension check on every returned vector
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//!
//! # Example
//! ```no_run
//! use docqa_core::config::EmbeddingSettings;
//! use docqa_knowledge::embeddings::{EmbeddingProvider, OpenAiProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAiProvider::new(&EmbeddingSettings::default(), "sk-...")?;
//! let embedding = provider.embed("Hello world").await?;
//! assert_eq!(embedding.len(), 1536);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use docqa_core::config::EmbeddingSettings;
use docqa_core::{AppError, AppResult};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const EMBEDDING_PATH: &str = "/v1/embeddings";

/// Maximum texts sent in one request
pub const MAX_BATCH_SIZE: usize = 100;

/// Maximum attempts per request
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// OpenAI embedding provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    /// `{endpoint}/v1/embeddings`
    url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Error body returned by the API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Failure of a single attempt, tagged with whether a retry may help.
#[derive(Debug)]
struct AttemptError {
    retryable: bool,
    error: AppError,
}

impl OpenAiProvider {
    /// Create a provider from settings; the HTTP client is built once here.
    pub fn new(settings: &EmbeddingSettings, api_key: &str) -> AppResult<Self> {
        let endpoint = settings.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "Embedding endpoint must start with http:// or https://, got '{}'",
                endpoint
            )));
        }

        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AppError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}{}", endpoint.trim_end_matches('/'), EMBEDDING_PATH),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        })
    }

    /// Embed one batch, retrying transient failures.
    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.embed_once(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(failure) if failure.retryable && attempt < MAX_RETRIES => {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}; retrying in {}ms",
                        attempt, MAX_RETRIES, failure.error, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AttemptError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        debug!("Sending embedding request to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError {
                retryable: true,
                error: AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);

            return Err(AttemptError {
                retryable: is_retryable(status),
                error: AppError::Embedding(format!("OpenAI API error ({}): {}", status, message)),
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| AttemptError {
            retryable: false,
            error: AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)),
        })?;

        self.convert_response(body, texts.len())
            .map_err(|error| AttemptError {
                retryable: false,
                error,
            })
    }

    /// Order vectors by their input index and check count and dimensions.
    fn convert_response(
        &self,
        mut response: EmbeddingResponse,
        expected: usize,
    ) -> AppResult<Vec<Vec<f32>>> {
        if response.data.len() != expected {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                response.data.len(),
                expected
            )));
        }

        response.data.sort_by_key(|d| d.index);

        response
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(AppError::Embedding(format!(
                        "Unexpected embedding dimensions: got {}, expected {}",
                        d.embedding.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai"))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(AppError::Embedding(format!(
                "Cannot embed empty text (input {})",
                position
            )));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            embeddings.extend(self.embed_with_retries(batch).await?);
        }

        debug!("Generated {} embeddings", embeddings.len());

        Ok(embeddings)
    }
}
