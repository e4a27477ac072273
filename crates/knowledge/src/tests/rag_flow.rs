//! End-to-end ingestion and query flows with local providers.

use crate::embeddings::{EmbeddingProvider, MockProvider};
use crate::rag::{
    AnswerSynthesizer, IngestionOptions, IngestionService, LanguageModel, QueryService,
    RagService, Retriever, ServiceMode,
};
use crate::vector_index::{open_index, IndexMode, SimilarityMetric};
use async_trait::async_trait;
use docqa_core::{AppConfig, AppError, AppResult, RagConfig};
use docqa_llm::MockLlmClient;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    const DIMENSIONS: usize = 256;

    struct Fixture {
        _workspace: TempDir,
        data_dir: std::path::PathBuf,
        config: RagConfig,
        app: AppConfig,
    }

    fn write_docs(dir: &Path, docs: &[(&str, &str)]) {
        for (name, text) in docs {
            std::fs::write(dir.join(name), text).unwrap();
        }
    }

    /// Workspace with a `data/` directory, a SQLite store under `store/` and
    /// mock providers in the runtime settings.
    fn fixture(docs: &[(&str, &str)]) -> Fixture {
        let workspace = TempDir::new().unwrap();
        let data_dir = workspace.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        write_docs(&data_dir, docs);

        let store = workspace.path().join("store");
        let config = RagConfig::new(
            "idx1",
            "demo",
            "docs",
            "sk-test",
            store.to_string_lossy().to_string(),
        )
        .unwrap();

        let mut app = AppConfig {
            workspace: workspace.path().to_path_buf(),
            ..AppConfig::default()
        };
        app.embedding.provider = "mock".to_string();
        app.embedding.dimensions = DIMENSIONS;
        app.llm.provider = "mock".to_string();

        Fixture {
            _workspace: workspace,
            data_dir,
            config,
            app,
        }
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(MockProvider::new(DIMENSIONS))
    }

    /// Embedder standing in for an unreachable embedding service.
    #[derive(Debug)]
    struct UnavailableEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnavailableEmbedder {
        fn provider_name(&self) -> &str {
            "unavailable"
        }

        fn model_name(&self) -> &str {
            "none"
        }

        fn dimensions(&self) -> usize {
            DIMENSIONS
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Embedding(
                "Embedding service returned 503 after 3 attempts".to_string(),
            ))
        }
    }

    fn options(data_dir: &Path) -> IngestionOptions {
        IngestionOptions {
            data_dir: data_dir.to_path_buf(),
            extension: "txt".to_string(),
            reset: false,
        }
    }

    /// Query service over the fixture's index with a canned model reply.
    fn query_service(fx: &Fixture, reply: &str, top_k: usize) -> (QueryService, Arc<MockLlmClient>) {
        let index = open_index(&fx.config, IndexMode::Bind, SimilarityMetric::Cosine).unwrap();
        let client = Arc::new(MockLlmClient::new(reply));
        let service = QueryService::new(
            fx.config.clone(),
            Retriever::new(embedder(), index, top_k),
            AnswerSynthesizer::new(client.clone(), "test-model"),
        );
        (service, client)
    }

    #[tokio::test]
    async fn test_sky_scenario_answer_is_trimmed() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);

        let ingested = RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        assert_eq!(ingested.mode(), ServiceMode::Ingestion);

        let (service, client) = query_service(&fx, " The sky is blue. \n", 4);
        let answer = service.answer("What color is the sky?").await.unwrap();

        assert_eq!(answer, "The sky is blue.");
        assert_eq!(client.call_count(), 1);

        let prompt = client.last_prompt().unwrap();
        assert!(prompt.contains("The sky is blue."));
        assert!(prompt.contains("Question: What color is the sky?"));
    }

    #[tokio::test]
    async fn test_ingestion_mode_rejects_query_operations() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);

        let service = RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        assert!(matches!(
            service.answer("What color is the sky?").await,
            Err(AppError::InvalidMode(_))
        ));
        assert!(matches!(
            service.tokenize("The sky is blue.").await,
            Err(AppError::InvalidMode(_))
        ));
        assert!(matches!(
            service.answer_with_sources("sky").await,
            Err(AppError::InvalidMode(_))
        ));
    }

    #[tokio::test]
    async fn test_query_variant_calls_model_once_per_answer() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        let (query, client) = query_service(&fx, "Blue.", 4);
        let service = RagService::Query(query);
        assert_eq!(client.call_count(), 0);

        service.tokenize("The sky is blue.").await.unwrap();
        assert_eq!(client.call_count(), 0);

        assert_eq!(service.answer("What color is the sky?").await.unwrap(), "Blue.");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ingestion_report() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
            ("notes.md", "Not a text document."),
            ("empty.txt", "   "),
        ]);

        let service = IngestionService::run(
            fx.config.clone(),
            embedder(),
            open_index(&fx.config, IndexMode::Create, SimilarityMetric::Cosine).unwrap(),
            &options(&fx.data_dir),
        )
        .await
        .unwrap();

        let report = service.report();
        assert_eq!(report.index_name, "idx1");
        assert_eq!(report.documents_loaded, 2);
        assert_eq!(report.documents_written, 2);
        assert_eq!(report.run_id.len(), 36);
        assert_eq!(service.index().count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reingest_does_not_grow_index() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
        ]);

        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        let second = IngestionService::from_app_config(
            fx.config.clone(),
            &fx.app,
            &IngestionOptions::from_app_config(&fx.app),
        )
        .await
        .unwrap();

        assert_eq!(second.index().count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reset_removes_deleted_files() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
        ]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        std::fs::remove_file(fx.data_dir.join("grass.txt")).unwrap();
        let mut opts = options(&fx.data_dir);
        opts.reset = true;

        let service = IngestionService::from_app_config(fx.config.clone(), &fx.app, &opts)
            .await
            .unwrap();
        assert_eq!(service.index().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_previous_index() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
        ]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        let mut opts = options(&fx.data_dir);
        opts.reset = true;
        let result = IngestionService::run(
            fx.config.clone(),
            Arc::new(UnavailableEmbedder),
            open_index(&fx.config, IndexMode::Create, SimilarityMetric::Cosine).unwrap(),
            &opts,
        )
        .await;
        assert!(matches!(result, Err(AppError::Embedding(_))));

        let index = open_index(&fx.config, IndexMode::Bind, SimilarityMetric::Cosine).unwrap();
        assert_eq!(index.count().unwrap(), 2);

        let (service, _) = query_service(&fx, "Blue.", 4);
        assert_eq!(service.answer("What color is the sky?").await.unwrap(), "Blue.");
    }

    #[tokio::test]
    async fn test_edited_file_replaces_its_entry() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
        ]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        write_docs(&fx.data_dir, &[("sky.txt", "The sky is grey.")]);
        let service = IngestionService::from_app_config(
            fx.config.clone(),
            &fx.app,
            &IngestionOptions::from_app_config(&fx.app),
        )
        .await
        .unwrap();
        assert_eq!(service.index().count().unwrap(), 2);

        let (query, _) = query_service(&fx, "Grey.", 4);
        let results = query.retriever().search("The sky is grey.", 4).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.document.text != "The sky is blue."));
        assert_eq!(results[0].document.text, "The sky is grey.");
    }

    #[tokio::test]
    async fn test_exact_text_is_top_hit() {
        let texts = [
            "How to exclude the minimum dependency rule in gradleLint plugin",
            "The sky is blue.",
            "Rust is a systems programming language",
            "Grass is green in spring",
        ];
        let docs: Vec<(String, &str)> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| (format!("doc{}.txt", i), *t))
            .collect();
        let doc_refs: Vec<(&str, &str)> = docs.iter().map(|(n, t)| (n.as_str(), *t)).collect();
        let fx = fixture(&doc_refs);

        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        let (service, _) = query_service(&fx, "unused", 4);

        for text in texts {
            let results = service.retriever().search(text, 1).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].document.text, text);
        }
    }

    #[tokio::test]
    async fn test_search_bounded_and_ordered() {
        let fx = fixture(&[
            ("a.txt", "The sky is blue."),
            ("b.txt", "Grass is green."),
            ("c.txt", "The sea is blue and deep."),
        ]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        let (service, _) = query_service(&fx, "unused", 4);

        for k in 1..=5 {
            let results = service.retriever().search("blue sky", k).await.unwrap();
            assert!(results.len() <= k);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_answer_with_sources() {
        let fx = fixture(&[
            ("sky.txt", "The sky is blue."),
            ("grass.txt", "Grass is green."),
        ]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        let (service, _) = query_service(&fx, "Blue.", 1);

        let answer = service.answer_with_sources("What color is the sky?").await.unwrap();

        assert_eq!(answer.answer, "Blue.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].document.text, "The sky is blue.");
        assert!(answer.top_score().unwrap() > 0.5);
    }

    #[tokio::test]
    async fn test_tokenize_returns_provider_dimensions() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        let service = RagService::new(fx.config.clone(), false, &fx.app).await.unwrap();
        assert_eq!(service.mode(), ServiceMode::Query);

        let vector = service.tokenize("The sky is blue.").await.unwrap();
        assert_eq!(vector.len(), DIMENSIONS);
    }

    #[tokio::test]
    async fn test_empty_index_answer_is_retrieval_error() {
        let fx = fixture(&[]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();
        let (service, client) = query_service(&fx, "unused", 4);

        assert!(matches!(
            service.answer("What color is the sky?").await,
            Err(AppError::Retrieval(_))
        ));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_generation_error() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);
        RagService::new(fx.config.clone(), true, &fx.app).await.unwrap();

        let index = open_index(&fx.config, IndexMode::Bind, SimilarityMetric::Cosine).unwrap();
        let service = QueryService::new(
            fx.config.clone(),
            Retriever::new(embedder(), index, 4),
            AnswerSynthesizer::new(Arc::new(MockLlmClient::failing("quota exceeded")), "m"),
        );

        assert!(matches!(
            service.answer("What color is the sky?").await,
            Err(AppError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_to_missing_index_fails() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);

        let result = RagService::new(fx.config.clone(), false, &fx.app).await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_memory_storage_cannot_be_queried_fresh() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);
        let config = RagConfig::new("idx1", "demo", "docs", "sk-test", "memory://").unwrap();

        let ingested = RagService::new(config.clone(), true, &fx.app).await.unwrap();
        match ingested {
            RagService::Ingestion(service) => assert_eq!(service.index().count().unwrap(), 1),
            RagService::Query(_) => panic!("expected an ingestion service"),
        }

        assert!(matches!(
            RagService::new(config, false, &fx.app).await,
            Err(AppError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_storage_uri() {
        let fx = fixture(&[("sky.txt", "The sky is blue.")]);
        let config =
            RagConfig::new("idx1", "demo", "docs", "sk-test", "mongodb://localhost:27017").unwrap();

        assert!(matches!(
            RagService::new(config, true, &fx.app).await,
            Err(AppError::Config(_))
        ));
    }
}
