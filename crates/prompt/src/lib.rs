//! Prompt templates for docqa.
//!
//! The answer synthesizer "stuffs" every retrieved document into a single
//! prompt. This crate owns that prompt:
//! - a built-in default QA template
//! - YAML-defined replacement templates
//! - Handlebars rendering with `{{context}}` and `{{question}}`

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, default_prompt};
pub use loader::load_prompt;
pub use types::{BuiltPrompt, PromptDefinition};
