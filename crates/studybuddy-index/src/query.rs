//! Hybrid lexical + vector query model.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::RetrievalError;
use crate::types::{SOURCE_FIELDS, TEXT_FIELDS};

/// Largest number of results a single query may return.
pub const MAX_TOP_K: usize = 5;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Painless script for the semantic clause. Weights arrive as params so the
/// script compiles once per cluster regardless of configuration.
pub const VECTOR_SCRIPT: &str = "params.w_header * cosineSimilarity(params.query_vector, 'header_vec') + params.w_subheader * cosineSimilarity(params.query_vector, 'subheader_vec') + params.w_doc_text * cosineSimilarity(params.query_vector, 'doc_text_vec') + params.offset";

/// Blend of lexical and vector signals.
///
/// The vector clause scores `header * cos(q, header_vec) + subheader * cos(q,
/// subheader_vec) + doc_text * cos(q, doc_text_vec) + offset`; the lexical clause
/// is multiplied by `lexical_boost`. The offset keeps the script score
/// non-negative, which Elasticsearch requires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub header: f64,
    pub subheader: f64,
    pub doc_text: f64,
    pub offset: f64,
    pub lexical_boost: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            header: 0.2,
            subheader: 0.2,
            doc_text: 0.6,
            offset: 1.0,
            lexical_boost: 0.05,
        }
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn vector_sum(&self) -> f64 {
        self.header + self.subheader + self.doc_text
    }

    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidWeights`] if any weight is negative or
    /// non-finite, or the three vector weights do not sum to 1.0.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        let all = [
            ("header", self.header),
            ("subheader", self.subheader),
            ("doc_text", self.doc_text),
            ("offset", self.offset),
            ("lexical_boost", self.lexical_boost),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                return Err(RetrievalError::InvalidWeights(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = self.vector_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RetrievalError::InvalidWeights(format!(
                "header + subheader + doc_text must equal 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// A single hybrid search request.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub text: String,
    pub vector: Vec<f32>,
    pub weights: ScoringWeights,
    pub size: usize,
}

impl HybridQuery {
    #[must_use]
    pub fn new(text: impl Into<String>, vector: Vec<f32>, weights: ScoringWeights) -> Self {
        Self {
            text: text.into(),
            vector,
            weights,
            size: MAX_TOP_K,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.clamp(1, MAX_TOP_K);
        self
    }

    /// Elasticsearch `_search` body: a bool query whose two `must` clauses both
    /// contribute to the score.
    #[must_use]
    pub fn to_request_body(&self) -> serde_json::Value {
        let w = &self.weights;
        json!({
            "query": {
                "bool": {
                    "must": [
                        {
                            "multi_match": {
                                "query": self.text,
                                "fields": TEXT_FIELDS,
                                "type": "best_fields",
                                "boost": w.lexical_boost,
                            }
                        },
                        {
                            "script_score": {
                                "query": { "match_all": {} },
                                "script": {
                                    "source": VECTOR_SCRIPT,
                                    "params": {
                                        "query_vector": self.vector,
                                        "w_header": w.header,
                                        "w_subheader": w.subheader,
                                        "w_doc_text": w.doc_text,
                                        "offset": w.offset,
                                    }
                                }
                            }
                        }
                    ]
                }
            },
            "size": self.size,
            "_source": SOURCE_FIELDS,
        })
    }
}
