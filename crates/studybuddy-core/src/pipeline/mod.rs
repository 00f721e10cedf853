pub mod chain;
pub mod step;
pub mod steps;

pub use chain::AnswerChain;
pub use step::{Stage, Step};
pub use steps::{AugmentStep, EmbedStep, GenerateStep, RagOutcome, RetrieveStep};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use studybuddy_index::{
        DocumentChunk, HybridRetriever, InMemoryBackend, IndexBackend, RetrievalConfig,
        mapping::infer_mapping,
    };
    use studybuddy_llm::mock::{MockBackend, MockEmbedder};

    use super::steps::{Augmented, EmbeddedQuestion, Retrieved};
    use super::*;
    use crate::error::RagError;
    use crate::generator::Generator;

    #[tokio::test]
    async fn embed_step_failure_maps_to_embedding_error() {
        let step = EmbedStep::new(Arc::new(MockEmbedder::failing()));
        let err = step.run("q".into()).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(err.stage(), Some(EmbedStep::<MockEmbedder>::STAGE));
    }

    async fn iaas_retriever() -> Arc<HybridRetriever> {
        let backend = Arc::new(InMemoryBackend::new());
        let chunk = DocumentChunk {
            doc_id: "1".into(),
            header: "Cloud Concepts".into(),
            subheader: "IaaS".into(),
            doc_text: "IaaS lets you rent virtualized hardware.".into(),
            document: None,
            header_vec: vec![1.0, 0.0],
            subheader_vec: vec![1.0, 0.0],
            doc_text_vec: vec![1.0, 0.0],
        };
        let def = infer_mapping(std::slice::from_ref(&chunk), 2, None).unwrap();
        backend.recreate_index("az900", def).await.unwrap();
        backend.index_documents("az900", vec![chunk]).await.unwrap();

        let retriever = HybridRetriever::new(
            backend,
            RetrievalConfig {
                index: "az900".into(),
                ..RetrievalConfig::default()
            },
        )
        .unwrap();
        Arc::new(retriever)
    }

    #[tokio::test]
    async fn retrieve_step_passes_question_through() {
        let out: Retrieved = RetrieveStep::new(iaas_retriever().await)
            .run(EmbeddedQuestion {
                question: "What is IaaS?".into(),
                vector: vec![1.0, 0.0],
            })
            .await
            .unwrap();
        assert_eq!(out.question, "What is IaaS?");
        assert_eq!(out.results.len(), 1);
    }

    #[tokio::test]
    async fn augment_then_generate() {
        let backend = MockBackend::with_responses(vec!["answer".into()]);
        let augmented = AugmentStep
            .run(Retrieved {
                question: "What is IaaS?".into(),
                results: vec![],
            })
            .await
            .unwrap();
        let out = GenerateStep::new(Generator::new(backend.clone()))
            .run(augmented)
            .await
            .unwrap();
        assert_eq!(out.generation.answer, "answer");
        assert!(out.results.is_empty());
        assert_eq!(backend.calls()[0][0].content, out.prompt);
    }

    #[tokio::test]
    async fn generate_step_failure_maps_to_generation_error() {
        let err = GenerateStep::new(Generator::new(MockBackend::failing()))
            .run(Augmented {
                results: vec![],
                prompt: "p".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
        assert_eq!(err.stage(), Some(Stage::Generate));
    }

    #[tokio::test]
    async fn chain_runs_stages_in_order() {
        let embedder = MockEmbedder::fixed(vec![1.0, 0.0]);
        let backend = MockBackend::with_responses(vec!["Rented hardware.".into()]);
        let chain = AnswerChain::new(
            Arc::new(embedder.clone()),
            iaas_retriever().await,
            Generator::new(backend.clone()),
        );

        let outcome = chain.run("What is IaaS?".into()).await.unwrap();
        assert_eq!(embedder.calls(), ["What is IaaS?"]);
        assert_eq!(outcome.results[0].subheader, "IaaS");
        assert!(outcome.prompt.contains("Notes: IaaS lets you rent virtualized hardware."));
        assert_eq!(backend.calls()[0][0].content, outcome.prompt);
        assert_eq!(outcome.generation.answer, "Rented hardware.");
    }

    #[tokio::test]
    async fn chain_stops_at_retrieval_failure() {
        let backend = MockBackend::default();
        let chain = AnswerChain::new(
            Arc::new(MockEmbedder::fixed(vec![1.0, 0.0, 0.0])),
            iaas_retriever().await,
            Generator::new(backend.clone()),
        );

        let err = chain.run("What is IaaS?".into()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Retrieve));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn chain_stops_at_embedding_failure() {
        let backend = MockBackend::default();
        let chain = AnswerChain::new(
            Arc::new(MockEmbedder::failing()),
            iaas_retriever().await,
            Generator::new(backend.clone()),
        );

        let err = chain.run("What is IaaS?".into()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Embed));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn stages_are_named() {
        let names: Vec<_> = [Stage::Embed, Stage::Retrieve, Stage::Augment, Stage::Generate]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["embed", "retrieve", "augment", "generate"]);
        assert_eq!(RagError::NotConfigured.stage(), None);
    }
}
