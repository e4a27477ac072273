//! Prompt builder: stuffs context documents and the question into a template.

use crate::types::{BuiltPrompt, PromptDefinition};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

const DEFAULT_PROMPT_ID: &str = "qa.stuff.default";

const DEFAULT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{{context}}

Question: {{question}}
Helpful Answer:";

/// The built-in "stuff" QA prompt.
pub fn default_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_PROMPT_ID.to_string(),
        title: "Stuff documents QA".to_string(),
        api_version: "1.0".to_string(),
        template: DEFAULT_TEMPLATE.to_string(),
        document_separator: "\n\n".to_string(),
    }
}

/// Render `definition` with every context text and the question.
///
/// Context texts are joined with the definition's separator, in the order
/// given.
///
/// # Example
/// ```
/// use docqa_prompt::{build_prompt, default_prompt};
///
/// let built = build_prompt(&default_prompt(), "What color is the sky?", &["The sky is blue."]).unwrap();
/// assert!(built.text.contains("The sky is blue."));
/// assert!(built.text.contains("Question: What color is the sky?"));
/// ```
pub fn build_prompt<S: AsRef<str>>(
    definition: &PromptDefinition,
    question: &str,
    contexts: &[S],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt '{}' with {} context documents",
        definition.id,
        contexts.len()
    );

    let context = contexts
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(&definition.document_separator);

    let mut variables = HashMap::new();
    variables.insert("context".to_string(), context);
    variables.insert("question".to_string(), question.to_string());

    let text = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        text,
        source_prompt_id: definition.id.clone(),
        context_documents: contexts.len(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_stuffs_all_documents() {
        let contexts = vec!["First document.".to_string(), "Second document.".to_string()];
        let built = build_prompt(&default_prompt(), "Which documents?", &contexts).unwrap();

        assert!(built
            .text
            .contains("First document.\n\nSecond document."));
        assert!(built.text.ends_with("Question: Which documents?\nHelpful Answer:"));
        assert_eq!(built.context_documents, 2);
        assert_eq!(built.source_prompt_id, DEFAULT_PROMPT_ID);
    }

    #[test]
    fn test_no_html_escaping() {
        let built = build_prompt(&default_prompt(), "a < b && c > d?", &["x & y"]).unwrap();
        assert!(built.text.contains("a < b && c > d?"));
        assert!(built.text.contains("x & y"));
    }

    #[test]
    fn test_custom_separator() {
        let definition = PromptDefinition {
            document_separator: "\n---\n".to_string(),
            template: "{{context}}|{{question}}".to_string(),
            ..default_prompt()
        };

        let built = build_prompt(&definition, "q", &["a", "b"]).unwrap();
        assert_eq!(built.text, "a\n---\nb|q");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let vars = HashMap::new();
        let result = render_template("{{#if}}", &vars);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
