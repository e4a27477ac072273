//! Ingest command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult, RagConfig};
use docqa_knowledge::{IngestionOptions, IngestionService};
use std::path::PathBuf;

/// Load, embed and index the documents of the data directory
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory holding the documents (default: `data` in the workspace)
    #[arg(short, long, env = "DOCQA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// File extension of the documents to load
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Replace the index content instead of adding to it
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig, rag_config: RagConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest command options: {:?}", self);

        let mut options = IngestionOptions::from_app_config(config);
        if let Some(dir) = &self.data_dir {
            options.data_dir = config.resolve_path(dir);
        }
        if let Some(extension) = &self.extension {
            options.extension = extension.clone();
        }
        options.reset = self.reset;

        let service = IngestionService::from_app_config(rag_config, config, &options).await?;
        let report = service.report();

        if self.json {
            let output = serde_json::json!({
                "runId": report.run_id,
                "index": report.index_name,
                "collection": service.config().collection_name(),
                "documentsLoaded": report.documents_loaded,
                "documentsWritten": report.documents_written,
                "indexSize": service.index().count()?,
                "durationSecs": report.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} documents into '{}' in {:.2}s",
                report.documents_written, report.index_name, report.duration_secs
            );
        }

        Ok(())
    }
}
