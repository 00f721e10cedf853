//! Elasticsearch REST backend.

use std::collections::HashMap;
use std::fmt::Write;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::backend::{BoxFuture, IndexBackend};
use crate::error::{IndexError, RetrievalError};
use crate::mapping::{IndexDefinition, IndexInfo, Mappings};
use crate::query::HybridQuery;
use crate::types::{DocumentChunk, SearchResult};

const BULK_BATCH: usize = 500;
const MAX_REASON_CHARS: usize = 300;

#[derive(Clone)]
pub struct ElasticsearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ElasticsearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: SearchResult,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct MappingEnvelope {
    #[serde(default)]
    mappings: Mappings,
}

impl ElasticsearchBackend {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: studybuddy_llm::http::default_client(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn bulk(&self, index: &str, batch: &[DocumentChunk]) -> Result<(), IndexError> {
        let mut body = String::new();
        for chunk in batch {
            let action = serde_json::json!({"index": {"_index": index, "_id": chunk.doc_id}});
            let _ = writeln!(body, "{action}");
            let _ = writeln!(body, "{}", serde_json::to_string(chunk)?);
        }

        let response = self
            .client
            .post(self.url("_bulk?refresh=true"))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(IndexError::Backend {
                status: status.as_u16(),
                body: error_reason(&text),
            });
        }

        let parsed: BulkResponse = serde_json::from_str(&text)?;
        if parsed.errors {
            let failures: Vec<&serde_json::Value> = parsed
                .items
                .iter()
                .filter_map(|item| item.get("index").and_then(|op| op.get("error")))
                .collect();
            let reason = failures
                .first()
                .and_then(|e| e.get("reason"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown bulk error")
                .to_owned();
            return Err(IndexError::Bulk {
                failed: failures.len(),
                reason,
            });
        }
        Ok(())
    }
}

/// Pull `error.reason` out of an Elasticsearch error body, falling back to the raw text.
fn error_reason(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &value["error"];
        if let Some(reason) = error["root_cause"][0]["reason"]
            .as_str()
            .or_else(|| error["reason"].as_str())
            .or_else(|| error.as_str())
        {
            return reason.to_owned();
        }
    }
    body.chars().take(MAX_REASON_CHARS).collect()
}

impl IndexBackend for ElasticsearchBackend {
    fn ping(&self) -> BoxFuture<'_, Result<(), IndexError>> {
        Box::pin(async move {
            let response = self.client.get(self.url("")).send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(IndexError::Backend {
                    status: status.as_u16(),
                    body: error_reason(&response.text().await.unwrap_or_default()),
                })
            }
        })
    }

    fn recreate_index(
        &self,
        index: &str,
        definition: IndexDefinition,
    ) -> BoxFuture<'_, Result<(), IndexError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let response = self
                .client
                .delete(self.url(&format!("{index}?ignore_unavailable=true")))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
                return Err(IndexError::Backend {
                    status: status.as_u16(),
                    body: error_reason(&response.text().await.unwrap_or_default()),
                });
            }

            let response = self
                .client
                .put(self.url(&index))
                .json(&definition)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(IndexError::Backend {
                    status: status.as_u16(),
                    body: error_reason(&response.text().await.unwrap_or_default()),
                });
            }
            tracing::info!(index = %index, "created index");
            Ok(())
        })
    }

    fn index_documents(
        &self,
        index: &str,
        chunks: Vec<DocumentChunk>,
    ) -> BoxFuture<'_, Result<usize, IndexError>> {
        let index = index.to_owned();
        Box::pin(async move {
            for (n, batch) in chunks.chunks(BULK_BATCH).enumerate() {
                self.bulk(&index, batch).await?;
                tracing::debug!(index = %index, batch = n, docs = batch.len(), "bulk indexed");
            }
            Ok(chunks.len())
        })
    }

    fn search(
        &self,
        index: &str,
        query: HybridQuery,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>, RetrievalError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(&format!("{index}/_search")))
                .json(&query.to_request_body())
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(RetrievalError::Query {
                    status: status.as_u16(),
                    reason: error_reason(&text),
                });
            }

            let parsed: SearchResponse = serde_json::from_str(&text)?;
            Ok(parsed
                .hits
                .hits
                .into_iter()
                .map(|hit| SearchResult {
                    score: hit.score.unwrap_or_default(),
                    ..hit.source
                })
                .collect())
        })
    }

    fn index_info(&self, index: &str) -> BoxFuture<'_, Result<IndexInfo, RetrievalError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(&format!("{index}/_mapping")))
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(RetrievalError::Query {
                    status: status.as_u16(),
                    reason: error_reason(&text),
                });
            }
            let parsed: HashMap<String, MappingEnvelope> = serde_json::from_str(&text)?;
            Ok(parsed
                .into_values()
                .next()
                .map(|envelope| envelope.mappings.info())
                .unwrap_or_default())
        })
    }
}
