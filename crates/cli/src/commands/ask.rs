//! Ask command handler.
//!
//! Answers one question from the indexed documents.

use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult, RagConfig};
use docqa_knowledge::RagService;

const DEFAULT_QUESTION: &str = "How to exclude the minimum dependency rule in gradleLint plugin?";

/// Answer a question from the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(default_value = DEFAULT_QUESTION)]
    pub question: String,

    /// Number of documents to retrieve as context
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Print the context documents after the answer
    #[arg(long)]
    pub sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig, rag_config: RagConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            if top_k == 0 {
                return Err(AppError::InvalidArgument(
                    "--top-k must be at least 1".to_string(),
                ));
            }
            config.retrieval.top_k = top_k;
        }

        let service = RagService::new(rag_config, false, &config).await?;
        let answer = service.answer_with_sources(&self.question).await?;

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "answer": answer.answer,
                "topScore": answer.top_score(),
                "sources": answer.source_refs(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.answer);

            if self.sources {
                println!();
                for (i, source) in answer.source_refs().iter().enumerate() {
                    println!(
                        "[{}] {} (score {:.3})\n    {}",
                        i + 1,
                        source.source,
                        source.score,
                        source.snippet
                    );
                }
            }
        }

        Ok(())
    }
}
