//! Generative language model integration for docqa.
//!
//! A provider-agnostic [`LlmClient`] trait with two implementations:
//! - **OpenAI**: the hosted completions API
//! - **Mock**: a canned-response client for tests and offline runs
//!
//! # Example
//! ```no_run
//! use docqa_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("https://api.openai.com", "sk-...", 60)?;
//! let request = LlmRequest::new("Hello, world!", "gpt-3.5-turbo-instruct").with_temperature(0.5);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OpenAiClient};
