//! Process-local index that evaluates [`HybridQuery`] the way Elasticsearch does:
//! BM25 `best_fields` times the boost, plus the weighted cosine script score.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::backend::{BoxFuture, IndexBackend};
use crate::error::{IndexError, RetrievalError};
use crate::mapping::{IndexDefinition, IndexInfo};
use crate::query::HybridQuery;
use crate::types::{DocumentChunk, SearchResult, TEXT_FIELDS};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

struct StoredChunk {
    chunk: DocumentChunk,
    tokens: [Vec<String>; 3],
}

#[derive(Default)]
struct MemoryIndex {
    definition: IndexDefinition,
    chunks: Vec<StoredChunk>,
}

pub struct InMemoryBackend {
    indices: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend").finish_non_exhaustive()
    }
}

/// Lowercased alphanumeric runs, close to the standard analyzer.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Best per-field BM25 score for every chunk, in storage order.
#[allow(clippy::cast_precision_loss)]
fn best_fields_bm25(terms: &[String], chunks: &[StoredChunk]) -> Vec<f64> {
    let n = chunks.len() as f64;
    let mut best = vec![0.0_f64; chunks.len()];
    if chunks.is_empty() {
        return best;
    }

    for field in 0..TEXT_FIELDS.len() {
        let total_len: usize = chunks.iter().map(|c| c.tokens[field].len()).sum();
        let avg_len = total_len as f64 / n;
        let mut field_scores = vec![0.0_f64; chunks.len()];

        for term in terms {
            let df = chunks
                .iter()
                .filter(|c| c.tokens[field].contains(term))
                .count();
            if df == 0 {
                continue;
            }
            let df = df as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for (score, c) in field_scores.iter_mut().zip(chunks) {
                let tf = c.tokens[field].iter().filter(|t| *t == term).count();
                if tf == 0 {
                    continue;
                }
                let tf = tf as f64;
                let len_norm = if avg_len > 0.0 {
                    c.tokens[field].len() as f64 / avg_len
                } else {
                    1.0
                };
                *score += idf * tf * (BM25_K1 + 1.0)
                    / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len_norm));
            }
        }

        for (b, s) in best.iter_mut().zip(field_scores) {
            *b = b.max(s);
        }
    }
    best
}

impl StoredChunk {
    fn new(chunk: DocumentChunk) -> Self {
        let tokens = TEXT_FIELDS.map(|f| tokenize(chunk.text(f).unwrap_or_default()));
        Self { chunk, tokens }
    }

    fn vector_score(&self, query: &HybridQuery) -> f64 {
        let w = &query.weights;
        let q = &query.vector;
        w.header * f64::from(cosine_similarity(q, &self.chunk.header_vec))
            + w.subheader * f64::from(cosine_similarity(q, &self.chunk.subheader_vec))
            + w.doc_text * f64::from(cosine_similarity(q, &self.chunk.doc_text_vec))
            + w.offset
    }

    fn dims(&self) -> usize {
        self.chunk.doc_text_vec.len()
    }
}

fn missing_index(index: &str) -> RetrievalError {
    RetrievalError::Query {
        status: 404,
        reason: format!("no such index [{index}]"),
    }
}

fn poisoned(e: impl std::fmt::Display) -> RetrievalError {
    RetrievalError::Query {
        status: 500,
        reason: e.to_string(),
    }
}

impl IndexBackend for InMemoryBackend {
    fn ping(&self) -> BoxFuture<'_, Result<(), IndexError>> {
        Box::pin(async { Ok(()) })
    }

    fn recreate_index(
        &self,
        index: &str,
        definition: IndexDefinition,
    ) -> BoxFuture<'_, Result<(), IndexError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let mut indices = self.indices.write().map_err(|e| IndexError::Backend {
                status: 500,
                body: e.to_string(),
            })?;
            indices.insert(
                index,
                MemoryIndex {
                    definition,
                    chunks: Vec::new(),
                },
            );
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
            let mut indices = self.indices.write().map_err(|e| IndexError::Backend {
                status: 500,
                body: e.to_string(),
            })?;
            let target = indices.entry(index).or_default();
            let count = chunks.len();
            for chunk in chunks {
                target.chunks.retain(|c| c.chunk.doc_id != chunk.doc_id);
                target.chunks.push(StoredChunk::new(chunk));
            }
            Ok(count)
        })
    }

    fn search(
        &self,
        index: &str,
        query: HybridQuery,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>, RetrievalError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let indices = self.indices.read().map_err(poisoned)?;
            let target = indices.get(&index).ok_or_else(|| missing_index(&index))?;

            if let Some(stored) = target.chunks.iter().find(|c| c.dims() != query.vector.len()) {
                return Err(RetrievalError::Query {
                    status: 400,
                    reason: format!(
                        "the query vector has a different number of dimensions [{}] than the \
                         document vectors [{}]",
                        query.vector.len(),
                        stored.dims()
                    ),
                });
            }

            let terms = tokenize(&query.text);
            let lexical = best_fields_bm25(&terms, &target.chunks);

            let mut scored: Vec<SearchResult> = target
                .chunks
                .iter()
                .zip(lexical)
                .filter(|(_, bm25)| *bm25 > 0.0)
                .map(|(c, bm25)| {
                    let score = query.weights.lexical_boost * bm25 + c.vector_score(&query);
                    c.chunk.to_result(score)
                })
                .collect();

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(query.size);
            Ok(scored)
        })
    }

    fn index_info(&self, index: &str) -> BoxFuture<'_, Result<IndexInfo, RetrievalError>> {
        let index = index.to_owned();
        Box::pin(async move {
            let indices = self.indices.read().map_err(poisoned)?;
            let target = indices.get(&index).ok_or_else(|| missing_index(&index))?;
            let mut info = target.definition.info();
            if info.dims.is_none() {
                info.dims = target.chunks.first().map(StoredChunk::dims);
            }
            Ok(info)
        })
    }
}
