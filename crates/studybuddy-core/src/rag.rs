//! The question-answering entry point.

use std::sync::Arc;

use studybuddy_index::HybridRetriever;
use studybuddy_llm::{Embedder, ModelBackend};
use tracing::Instrument;

use crate::error::RagError;
use crate::generator::{Generation, Generator};
use crate::pipeline::{AnswerChain, RagOutcome, Stage};

/// Embed → retrieve → augment → generate, in that order, for every question.
///
/// Holds only shared, immutable backend handles, so one instance can serve
/// concurrent callers.
pub struct Rag<E, B> {
    chain: AnswerChain<E, B>,
    backend_name: String,
    model: String,
}

impl<E, B> std::fmt::Debug for Rag<E, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rag")
            .field("backend", &self.backend_name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl<E: Embedder, B: ModelBackend> Rag<E, B> {
    #[must_use]
    pub fn new(embedder: Arc<E>, retriever: Arc<HybridRetriever>, backend: B) -> Self {
        let backend_name = backend.name().to_owned();
        let model = backend.model().to_owned();
        let chain = AnswerChain::new(embedder, retriever, Generator::new(backend));
        Self {
            chain,
            backend_name,
            model,
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `question` and return the retrieved chunks and rendered prompt as well.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage; no partial answer is produced.
    pub async fn answer_with_context(&self, question: &str) -> Result<RagOutcome, RagError> {
        let span = tracing::info_span!(
            "rag.answer",
            backend = %self.backend_name,
            model = %self.model,
            failed_stage = tracing::field::Empty
        );
        let result = self
            .chain
            .run(question.to_owned())
            .instrument(span.clone())
            .await;

        match &result {
            Ok(outcome) => tracing::info!(
                parent: &span,
                results = outcome.results.len(),
                latency_secs = outcome.generation.latency,
                "answered"
            ),
            Err(e) => tracing::warn!(
                parent: &span,
                stage = e.stage().map_or("none", Stage::as_str),
                error = %e,
                "answer aborted"
            ),
        }
        result
    }

    /// Answer `question`: the text, the backend's usage report and the generation latency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`], [`RagError::Retrieval`] or
    /// [`RagError::Generation`] for the stage that failed.
    pub async fn answer(&self, question: &str) -> Result<Generation, RagError> {
        self.answer_with_context(question)
            .await
            .map(|outcome| outcome.generation)
    }
}

#[cfg(test)]
mod tests {
    use studybuddy_index::{
        DocumentChunk, InMemoryBackend, IndexBackend, RetrievalConfig, RetrievalError,
        mapping::infer_mapping,
    };
    use studybuddy_llm::mock::{MockBackend, MockEmbedder};

    use super::*;

    const DIMS: usize = 16;

    async fn embed(embedder: &MockEmbedder, text: &str) -> Vec<f32> {
        embedder.embed(text).await.unwrap()
    }

    async fn chunk(
        embedder: &MockEmbedder,
        id: &str,
        header: &str,
        subheader: &str,
        doc_text: &str,
    ) -> DocumentChunk {
        DocumentChunk {
            doc_id: id.into(),
            header: header.into(),
            subheader: subheader.into(),
            doc_text: doc_text.into(),
            document: None,
            header_vec: embed(embedder, header).await,
            subheader_vec: embed(embedder, subheader).await,
            doc_text_vec: embed(embedder, doc_text).await,
        }
    }

    async fn study_index(embedder: &MockEmbedder) -> Arc<HybridRetriever> {
        let chunks = vec![
            chunk(
                embedder,
                "1",
                "Cloud Concepts",
                "IaaS",
                "IaaS lets you rent virtualized hardware.",
            )
            .await,
            chunk(
                embedder,
                "2",
                "Cloud Concepts",
                "PaaS",
                "PaaS provides a managed platform for building applications.",
            )
            .await,
            chunk(
                embedder,
                "3",
                "Core Services",
                "Blob Storage",
                "Blob Storage keeps unstructured objects such as images.",
            )
            .await,
        ];
        let backend = Arc::new(InMemoryBackend::new());
        let def = infer_mapping(&chunks, DIMS, Some(embedder.model_name())).unwrap();
        backend.recreate_index("az900", def).await.unwrap();
        backend.index_documents("az900", chunks).await.unwrap();
        Arc::new(
            HybridRetriever::new(
                backend,
                RetrievalConfig {
                    index: "az900".into(),
                    embedding_model: Some(embedder.model_name().to_owned()),
                    ..RetrievalConfig::default()
                },
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn answers_from_top_ranked_chunk() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let backend = MockBackend::with_responses(vec!["IaaS means renting hardware.".into()]);
        let rag = Rag::new(Arc::new(embedder), retriever, backend.clone());

        let outcome = rag.answer_with_context("What is IaaS?").await.unwrap();

        assert_eq!(outcome.results[0].subheader, "IaaS");
        assert!(outcome.prompt.contains("Sub-topic: IaaS"));
        assert!(outcome.prompt.contains("QUESTION: What is IaaS?"));
        assert!(!outcome.generation.answer.is_empty());
        assert_eq!(backend.calls()[0][0].content, outcome.prompt);
    }

    #[tokio::test]
    async fn answer_returns_text_usage_and_latency() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let rag = Rag::new(Arc::new(embedder), retriever, MockBackend::default());

        let (answer, usage, latency) = rag.answer("What is IaaS?").await.unwrap().into_parts();
        assert_eq!(answer, "mock response");
        assert_eq!(usage.map(|u| u.prompt_tokens), Some(10));
        assert!(latency >= 0.0);
    }

    #[tokio::test]
    async fn generation_failure_aborts_without_answer() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let backend = MockBackend::failing();
        let rag = Rag::new(Arc::new(embedder), retriever, backend.clone());

        let err = rag.answer("What is IaaS?").await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)), "{err:?}");
        assert_eq!(err.stage(), Some(Stage::Generate));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_skips_retrieval_and_generation() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let backend = MockBackend::default();
        let rag = Rag::new(Arc::new(MockEmbedder::failing()), retriever, backend.clone());

        let err = rag.answer("What is IaaS?").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(err.stage(), Some(Stage::Embed));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_aborts_before_generation() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let backend = MockBackend::default();
        let rag = Rag::new(Arc::new(MockEmbedder::hashing(DIMS + 1)), retriever, backend.clone());

        let err = rag.answer("What is IaaS?").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::Retrieval(RetrievalError::DimensionMismatch { .. })
        ));
        assert_eq!(err.stage(), Some(Stage::Retrieve));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn reports_backend_identity() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let rag = Rag::new(Arc::new(embedder), retriever, MockBackend::default());
        assert_eq!(rag.backend_name(), "mock");
        assert_eq!(rag.model(), "mock-model");
    }

    #[tokio::test]
    async fn concurrent_answers_share_one_instance() {
        let embedder = MockEmbedder::hashing(DIMS);
        let retriever = study_index(&embedder).await;
        let rag = Arc::new(Rag::new(Arc::new(embedder), retriever, MockBackend::default()));

        let handles: Vec<_> = ["What is IaaS?", "What is PaaS?", "Blob Storage?"]
            .into_iter()
            .map(|q| {
                let rag = Arc::clone(&rag);
                tokio::spawn(async move { rag.answer(q).await })
            })
            .collect();
        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }
    }
}
