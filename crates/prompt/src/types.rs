//! Prompt types.

use serde::{Deserialize, Serialize};

/// A prompt template definition, built in or loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Handlebars template; must reference `{{context}}` and `{{question}}`
    pub template: String,

    /// Separator placed between context documents
    #[serde(rename = "documentSeparator", default = "default_separator")]
    pub document_separator: String,
}

fn default_separator() -> String {
    "\n\n".to_string()
}

/// A rendered prompt ready for the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// The full prompt text
    pub text: String,

    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of context documents stuffed into the prompt
    #[serde(rename = "contextDocuments")]
    pub context_documents: usize,
}
