//! Answer synthesis: stuff every context document into one prompt and ask
//! the generative model.

use crate::types::Document;
use docqa_core::config::LlmSettings;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, default_prompt, PromptDefinition};
use std::sync::Arc;

/// Sampling temperature used unless configured otherwise.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Completion budget used unless configured otherwise.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    prompt: PromptDefinition,
}

impl AnswerSynthesizer {
    /// Synthesizer with the built-in stuff prompt and default sampling.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: default_prompt(),
        }
    }

    pub fn from_settings(client: Arc<dyn LlmClient>, settings: &LlmSettings) -> Self {
        Self::new(client, settings.model.clone())
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the built-in prompt template.
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn prompt(&self) -> &PromptDefinition {
        &self.prompt
    }

    /// Generate an answer to `query` grounded on `context`.
    ///
    /// Returns the model output untrimmed.
    ///
    /// # Errors
    /// `AppError::Generation` if `context` is empty, the model call fails, or
    /// the model returns only whitespace.
    #[tracing::instrument(skip_all, fields(documents = context.len(), model = %self.model))]
    pub async fn synthesize(&self, query: &str, context: &[Document]) -> AppResult<String> {
        if context.is_empty() {
            return Err(AppError::Generation(
                "No context documents to answer from".to_string(),
            ));
        }

        let texts: Vec<&str> = context.iter().map(|d| d.text.as_str()).collect();
        let prompt = build_prompt(&self.prompt, query, &texts)?;

        let request = LlmRequest::new(prompt.text, self.model.as_str())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        tracing::debug!(
            "Generating answer (provider: {}, temperature: {})",
            self.client.provider_name(),
            self.temperature
        );

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        if response.content.trim().is_empty() {
            return Err(AppError::Generation(
                "Language model returned an empty answer".to_string(),
            ));
        }

        tracing::debug!(
            "Answer generated ({} completion tokens)",
            response.usage.completion_tokens
        );

        Ok(response.content)
    }
}
