use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use studybuddy_core::config::{Config, EmbeddingConfig};
use studybuddy_core::session::NOT_CONFIGURED_REPLY;
use studybuddy_core::{ChatSession, Rag, RagError};
use studybuddy_index::{
    CorpusIndexer, HybridRetriever, InMemoryBackend, IndexBackend, RetrievalConfig, RetryPolicy,
    ScoringWeights, load_corpus,
};
use studybuddy_llm::mock::{MockBackend, MockEmbedder};
use studybuddy_llm::{Embedder, Role};

const DIMS: usize = 16;

const CORPUS: &str = r#"{"id": "1", "header": "Cloud Concepts", "subheader": "IaaS", "doc_text": "IaaS lets you rent virtualized hardware from Azure."}
{"id": "2", "header": "Cloud Concepts", "subheader": "PaaS", "doc_text": "PaaS provides a managed platform for building applications."}
{"id": "3", "header": "Core Services", "subheader": "Blob Storage", "doc_text": "Blob Storage keeps unstructured objects such as images."}
"#;

// -- Helpers --

fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("notes.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(CORPUS.as_bytes()).unwrap();
    path
}

async fn indexed_retriever(
    dir: &Path,
    embedder: &MockEmbedder,
) -> (Arc<InMemoryBackend>, Arc<HybridRetriever>) {
    let records = load_corpus(&write_corpus(dir)).await.unwrap();
    let backend = Arc::new(InMemoryBackend::new());

    let report = CorpusIndexer::new(backend.clone(), embedder.clone(), "az900")
        .with_retry(RetryPolicy {
            base_delay_ms: 1,
            max_delay_ms: 1,
            max_attempts: 1,
        })
        .run(records)
        .await
        .unwrap();
    assert_eq!(report.indexed, 3);
    assert_eq!(report.dims, DIMS);
    assert_eq!(report.embedded_fields, 9);

    let retriever = HybridRetriever::new(
        backend.clone(),
        RetrievalConfig {
            index: "az900".into(),
            embedding_model: Some(embedder.model_name().to_owned()),
            ..RetrievalConfig::default()
        },
    )
    .unwrap();
    (backend, Arc::new(retriever))
}

// -- Pipeline --

#[tokio::test]
async fn index_then_answer_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = MockEmbedder::hashing(DIMS);
    let (backend, retriever) = indexed_retriever(dir.path(), &embedder).await;

    let info = backend.index_info("az900").await.unwrap();
    assert_eq!(info.dims, Some(DIMS));
    assert_eq!(info.embedding_model.as_deref(), Some("mock-embedder"));

    let llm = MockBackend::with_responses(vec!["IaaS means renting infrastructure.".into()]);
    let rag = Rag::new(Arc::new(embedder), retriever, llm.clone());
    let outcome = rag.answer_with_context("What is IaaS?").await.unwrap();

    assert_eq!(outcome.results[0].doc_id, "1");
    assert_eq!(outcome.results[0].subheader, "IaaS");
    assert!(outcome.prompt.contains("Topic: Cloud Concepts"));
    assert!(outcome.prompt.contains("QUESTION: What is IaaS?"));
    assert_eq!(outcome.generation.answer, "IaaS means renting infrastructure.");
    assert_eq!(outcome.generation.usage.as_ref().map(|u| u.total_tokens), Some(15));
    assert!(outcome.generation.latency >= 0.0);

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0][0].role, Role::User);
    assert_eq!(calls[0][0].content, outcome.prompt);
}

#[tokio::test]
async fn answer_tuple_parts() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = MockEmbedder::hashing(DIMS);
    let (_, retriever) = indexed_retriever(dir.path(), &embedder).await;
    let rag = Rag::new(
        Arc::new(embedder),
        retriever,
        MockBackend::default().without_usage(),
    );

    let (answer, usage, latency) = rag.answer("What is IaaS?").await.unwrap().into_parts();
    assert_eq!(answer, "mock response");
    assert!(usage.is_none());
    assert!(latency >= 0.0);
}

#[tokio::test]
async fn embedder_with_other_dimension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, retriever) = indexed_retriever(dir.path(), &MockEmbedder::hashing(DIMS)).await;
    let llm = MockBackend::default();
    let rag = Rag::new(Arc::new(MockEmbedder::hashing(DIMS * 2)), retriever, llm.clone());

    let err = rag.answer("What is IaaS?").await.unwrap_err();
    assert!(matches!(err, RagError::Retrieval(_)), "{err}");
    assert!(llm.calls().is_empty());
}

// -- Chat session --

#[tokio::test]
async fn chat_session_placeholder_until_backend_selected() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(MockEmbedder::hashing(DIMS));
    let (_, retriever) = indexed_retriever(dir.path(), &embedder).await;

    let mut chat = ChatSession::new();
    assert_eq!(chat.ask("What is IaaS?").await.unwrap(), NOT_CONFIGURED_REPLY);

    chat.set_rag(Rag::new(
        embedder,
        retriever,
        MockBackend::with_responses(vec!["Rented hardware.".into()]),
    ));
    assert_eq!(chat.ask("What is IaaS?").await.unwrap(), "Rented hardware.");

    let transcript: Vec<_> = chat.history().iter().map(|m| m.role).collect();
    assert_eq!(
        transcript,
        [Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

// -- Configuration --

#[test]
fn shipped_default_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.index.weights, ScoringWeights::default());
    assert_eq!(config.index.retry, RetryPolicy::default());
}

#[test]
fn shipped_default_config_keeps_build_default_embedder() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load(&path).unwrap();
    let defaults = EmbeddingConfig::default();
    assert_eq!(config.embedding.provider, defaults.provider);
    assert_eq!(config.embedding.model_name(), defaults.model_name());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studybuddy.toml");
    std::fs::write(
        &path,
        r#"
[llm]
backend = "local"

[llm.local]
model = "llama3"

[index]
name = "az900_test"
top_k = 3
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.index.name, "az900_test");
    assert_eq!(config.index.top_k, 3);
    assert_eq!(config.llm.local.model, "llama3");
}
