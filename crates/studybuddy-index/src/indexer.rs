//! Offline indexing job: wait for the backend, fill in missing vectors, drop and
//! recreate the index, bulk load every chunk.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use studybuddy_llm::Embedder;

use crate::backend::IndexBackend;
use crate::error::{IndexError, Result};
use crate::mapping::infer_mapping;
use crate::types::{CorpusRecord, DocumentChunk};

/// Bounded exponential backoff for reaching the index backend at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 5000,
            max_attempts: 20,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (zero-based), capped at `max_delay_ms`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.base_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }
}

/// Ping until the backend answers or the attempts run out.
///
/// # Errors
///
/// Returns [`IndexError::Unavailable`] after `max_attempts` failed pings.
pub async fn wait_until_available(backend: &dyn IndexBackend, policy: &RetryPolicy) -> Result<()> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 0..attempts {
        match backend.ping().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    error = %e,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "index backend unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => tracing::error!(error = %e, "index backend unavailable, giving up"),
        }
    }
    Err(IndexError::Unavailable { attempts })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    /// Vector fields computed because the corpus did not carry them.
    pub embedded_fields: usize,
    pub dims: usize,
}

pub struct CorpusIndexer<E: Embedder> {
    backend: Arc<dyn IndexBackend>,
    embedder: E,
    index: String,
    retry: RetryPolicy,
}

impl<E: Embedder> CorpusIndexer<E> {
    #[must_use]
    pub fn new(backend: Arc<dyn IndexBackend>, embedder: E, index: impl Into<String>) -> Self {
        Self {
            backend,
            embedder,
            index: index.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn resolve_vector(
        &self,
        doc_id: &str,
        field: &str,
        given: Option<Vec<f32>>,
        text: &str,
        dims: usize,
        embedded: &mut usize,
    ) -> Result<Vec<f32>> {
        let vector = if let Some(v) = given {
            v
        } else {
            *embedded += 1;
            self.embedder.embed(text).await?
        };
        if vector.len() != dims {
            return Err(IndexError::Corpus(format!(
                "record {doc_id}: {field}_vec has {} dimensions, embedder produces {dims}",
                vector.len()
            )));
        }
        Ok(vector)
    }

    async fn to_chunk(
        &self,
        record: CorpusRecord,
        dims: usize,
        embedded: &mut usize,
    ) -> Result<DocumentChunk> {
        let id = record.doc_id.as_str();
        let header_vec = self
            .resolve_vector(id, "header", record.header_vec, &record.header, dims, embedded)
            .await?;
        let subheader_vec = self
            .resolve_vector(
                id,
                "subheader",
                record.subheader_vec,
                &record.subheader,
                dims,
                embedded,
            )
            .await?;
        let doc_text_vec = self
            .resolve_vector(
                id,
                "doc_text",
                record.doc_text_vec,
                &record.doc_text,
                dims,
                embedded,
            )
            .await?;
        Ok(DocumentChunk {
            doc_id: record.doc_id,
            header: record.header,
            subheader: record.subheader,
            doc_text: record.doc_text,
            document: record.document,
            header_vec,
            subheader_vec,
            doc_text_vec,
        })
    }

    /// Rebuild the index from `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend stays unreachable, embedding fails, a
    /// supplied vector has the wrong dimension, or the backend rejects a request.
    pub async fn run(&self, records: Vec<CorpusRecord>) -> Result<IndexReport> {
        wait_until_available(self.backend.as_ref(), &self.retry).await?;

        let dims = self.embedder.dimension().await?;
        let mut embedded_fields = 0;
        let mut chunks = Vec::with_capacity(records.len());
        for record in records {
            chunks.push(self.to_chunk(record, dims, &mut embedded_fields).await?);
        }

        let definition = infer_mapping(&chunks, dims, Some(self.embedder.model_name()))?;
        self.backend.recreate_index(&self.index, definition).await?;
        let indexed = self.backend.index_documents(&self.index, chunks).await?;

        tracing::info!(
            index = %self.index,
            indexed,
            embedded_fields,
            dims,
            "index rebuilt"
        );
        Ok(IndexReport {
            indexed,
            embedded_fields,
            dims,
        })
    }
}
