//! Wiring from [`Config`] to live backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use studybuddy_index::{ElasticsearchBackend, HybridRetriever, IndexBackend, RetrievalConfig};
use studybuddy_llm::embed::OllamaEmbedder;
use studybuddy_llm::local::LocalBackend;
use studybuddy_llm::openai::OpenAiBackend;
use studybuddy_llm::{AnyBackend, AnyEmbedder, Embedder};

use crate::config::{BackendKind, Config, EmbeddingConfig, EmbeddingKind, Secret};
use crate::rag::Rag;

pub type StudyRag = Rag<AnyEmbedder, AnyBackend>;

/// Priority: CLI `--config` > `STUDYBUDDY_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("STUDYBUDDY_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Build the chat backend for `kind`. An explicit `api_key` overrides the configured one.
///
/// # Errors
///
/// Returns an error if the hosted backend is chosen without any API key.
pub fn create_backend(
    kind: BackendKind,
    config: &Config,
    api_key: Option<&Secret>,
) -> anyhow::Result<AnyBackend> {
    let backend = match kind {
        BackendKind::Hosted => {
            let Some(key) = api_key
                .or(config.secrets.openai_api_key.as_ref())
                .filter(|k| !k.expose().trim().is_empty())
            else {
                bail!(
                    "hosted backend requires an API key: set OPENAI_API_KEY or pass one to /model hosted <key>"
                );
            };
            let mut backend = OpenAiBackend::new(
                key.expose().to_owned(),
                config.llm.hosted.base_url.clone(),
                config.llm.hosted.model.clone(),
            );
            if let Some(max) = config.llm.max_tokens {
                backend = backend.with_max_tokens(max);
            }
            AnyBackend::Hosted(backend)
        }
        BackendKind::Local => {
            let mut backend = LocalBackend::new(
                config.llm.local.base_url.clone(),
                config.llm.local.model.clone(),
            );
            if let Some(max) = config.llm.max_tokens {
                backend = backend.with_max_tokens(max);
            }
            AnyBackend::Local(backend)
        }
    };
    tracing::info!(backend = %kind, "model backend selected");
    Ok(backend)
}

/// # Errors
///
/// Returns an error if the Candle model cannot be loaded, or Candle is
/// requested without the `candle` feature.
pub async fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<AnyEmbedder> {
    let model = config.model_name().to_owned();
    match config.provider {
        EmbeddingKind::Ollama => Ok(AnyEmbedder::Ollama(OllamaEmbedder::new(
            &config.base_url,
            model,
        ))),
        #[cfg(feature = "candle")]
        EmbeddingKind::Candle => {
            let max_seq_length = config.max_seq_length;
            let embedder = tokio::task::spawn_blocking(move || {
                studybuddy_llm::embed::CandleEmbedder::load(&model, max_seq_length)
            })
            .await
            .context("embedding model loader panicked")?
            .context("failed to load embedding model")?;
            Ok(AnyEmbedder::Candle(embedder))
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingKind::Candle => {
            bail!("embedding.provider = \"candle\" requires building with the `candle` feature")
        }
    }
}

#[must_use]
pub fn create_index_backend(config: &Config) -> Arc<dyn IndexBackend> {
    Arc::new(ElasticsearchBackend::new(&config.index.url))
}

/// # Errors
///
/// Returns an error if the scoring weights are invalid.
pub fn create_retriever(
    config: &Config,
    backend: Arc<dyn IndexBackend>,
    embedding_model: &str,
) -> anyhow::Result<HybridRetriever> {
    HybridRetriever::new(
        backend,
        RetrievalConfig {
            index: config.index.name.clone(),
            weights: config.index.weights,
            top_k: config.index.top_k,
            embedding_model: Some(embedding_model.to_owned()),
        },
    )
    .context("failed to build retriever")
}

/// Query-side services shared by every backend selection in a session.
pub struct Services {
    embedder: Arc<AnyEmbedder>,
    retriever: Arc<HybridRetriever>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("embedder", &self.embedder.model_name())
            .field("retriever", &self.retriever)
            .finish()
    }
}

impl Services {
    /// # Errors
    ///
    /// Returns an error if the embedder or retriever cannot be built.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding).await?;
        let retriever = create_retriever(
            config,
            create_index_backend(config),
            embedder.model_name(),
        )?;
        Ok(Self::new(Arc::new(embedder), Arc::new(retriever)))
    }

    #[must_use]
    pub fn new(embedder: Arc<AnyEmbedder>, retriever: Arc<HybridRetriever>) -> Self {
        Self {
            embedder,
            retriever,
        }
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<AnyEmbedder> {
        &self.embedder
    }

    #[must_use]
    pub fn rag(&self, backend: AnyBackend) -> StudyRag {
        Rag::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.retriever),
            backend,
        )
    }
}
