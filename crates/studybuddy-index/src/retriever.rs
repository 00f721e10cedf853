//! Hybrid retrieval: one lexical + vector query, top-K ranked chunks.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::backend::IndexBackend;
use crate::error::RetrievalError;
use crate::mapping::IndexInfo;
use crate::query::{HybridQuery, MAX_TOP_K, ScoringWeights};
use crate::types::SearchResult;

/// Retrieval configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub index: String,
    pub weights: ScoringWeights,
    /// Clamped to `1..=5`.
    pub top_k: usize,
    /// Embedding model used at query time; compared with the one recorded at indexing.
    pub embedding_model: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index: "az900_course_notes".into(),
            weights: ScoringWeights::default(),
            top_k: MAX_TOP_K,
            embedding_model: None,
        }
    }
}

pub struct HybridRetriever {
    backend: Arc<dyn IndexBackend>,
    config: RetrievalConfig,
    info: OnceCell<IndexInfo>,
}

impl std::fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("config", &self.config)
            .field("info", &self.info.get())
            .finish_non_exhaustive()
    }
}

impl HybridRetriever {
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidWeights`] if the scoring weights do not validate.
    pub fn new(
        backend: Arc<dyn IndexBackend>,
        mut config: RetrievalConfig,
    ) -> Result<Self, RetrievalError> {
        config.weights.validate()?;
        config.top_k = config.top_k.clamp(1, MAX_TOP_K);
        Ok(Self {
            backend,
            config,
            info: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    async fn index_info(&self) -> Result<&IndexInfo, RetrievalError> {
        self.info
            .get_or_try_init(|| async {
                let info = self.backend.index_info(&self.config.index).await?;
                if let (Some(indexed), Some(configured)) =
                    (&info.embedding_model, &self.config.embedding_model)
                    && indexed != configured
                {
                    tracing::warn!(
                        index = %self.config.index,
                        indexed = %indexed,
                        configured = %configured,
                        "index was built with a different embedding model"
                    );
                }
                Ok::<_, RetrievalError>(info)
            })
            .await
    }

    /// Rank chunks for `question` using its embedding `vector`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::DimensionMismatch`] before any search if the
    /// vector does not match the indexed dimension, or a backend error.
    pub async fn retrieve(
        &self,
        question: &str,
        vector: &[f32],
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let info = self.index_info().await?;
        if let Some(expected) = info.dims
            && expected != vector.len()
        {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let query = HybridQuery::new(question, vector.to_vec(), self.config.weights)
            .with_size(self.config.top_k);
        let mut results = self.backend.search(&self.config.index, query).await?;
        results.truncate(self.config.top_k);

        tracing::debug!(
            hits = results.len(),
            top_score = results.first().map(|r| r.score),
            "hybrid retrieval complete"
        );
        Ok(results)
    }
}
