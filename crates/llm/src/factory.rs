//! LLM provider factory.
//!
//! Builds an [`LlmClient`] from the runtime settings and the credential held
//! by [`RagConfig`].

use crate::client::LlmClient;
use crate::providers::{MockLlmClient, OpenAiClient};
use docqa_core::config::LlmSettings;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Reply of the mock provider when selected from configuration.
const MOCK_REPLY: &str = "I don't know.";

/// Create an LLM client for `settings.provider`.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the endpoint is
/// malformed.
pub fn create_client(settings: &LlmSettings, api_key: &str) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => {
            let client = OpenAiClient::new(&settings.endpoint, api_key, settings.timeout)?;
            Ok(Arc::new(client))
        }
        "mock" => Ok(Arc::new(MockLlmClient::new(MOCK_REPLY))),
        other => Err(AppError::Config(format!(
            "Unknown LLM provider: {}. Supported: openai, mock",
            other
        ))),
    }
}
