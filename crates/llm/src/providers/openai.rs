//! OpenAI completions provider.
//!
//! Calls `POST {endpoint}/v1/completions` with a single prompt and reads
//! `choices[0].text`. API reference: https://platform.openai.com/docs/api-reference/completions

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docqa_core::{AppError, AppResult};
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI completions request body.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// OpenAI completions response body.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: String,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI completions client.
pub struct OpenAiClient {
    /// `{endpoint}/v1/completions`
    url: String,

    /// HTTP client with auth header and timeout preset
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for `endpoint` (e.g. `https://api.openai.com`).
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> AppResult<Self> {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "OpenAI endpoint must start with http:// or https://, got '{}'",
                endpoint
            )));
        }

        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AppError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: format!("{}/v1/completions", endpoint.trim_end_matches('/')),
            client,
        })
    }

    /// Convert LlmRequest to the OpenAI body.
    fn to_openai_request(&self, request: &LlmRequest) -> CompletionRequest {
        CompletionRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    /// Convert the OpenAI body to LlmResponse; no choice means no result.
    fn convert_response(&self, response: CompletionResponse) -> AppResult<LlmResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AppError::Generation("OpenAI response contained no choices".to_string())
        })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.text,
            model: response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to OpenAI");
        tracing::debug!(prompt_len = request.prompt.len(), "POST {}", self.url);

        let body = self.to_openai_request(request);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        let converted = self.convert_response(completion)?;

        tracing::info!(
            total_tokens = converted.usage.total_tokens,
            "Received completion from OpenAI"
        );

        Ok(converted)
    }
}
