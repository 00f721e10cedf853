//! Error types for studybuddy-index.

/// Errors raised while building the index offline.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading the corpus file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure talking to the index backend.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedding a missing vector field failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] studybuddy_llm::EmbedError),

    /// A corpus record is malformed or inconsistent with the embedder.
    #[error("invalid corpus: {0}")]
    Corpus(String),

    /// The backend answered with a non-success status.
    #[error("index backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    /// Bulk indexing reported per-document failures.
    #[error("{failed} documents failed to index: {reason}")]
    Bulk { failed: usize, reason: String },

    /// The backend never became reachable within the retry budget.
    #[error("index backend unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
}

/// Errors raised by a query against the index.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Query vector length differs from the indexed vector dimension.
    #[error("query vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The backend could not be reached.
    #[error("index backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the query.
    #[error("query rejected with status {status}: {reason}")]
    Query { status: u16, reason: String },

    /// The backend answered with a body that could not be decoded.
    #[error("malformed search response: {0}")]
    Json(#[from] serde_json::Error),

    /// Scoring weights failed validation.
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
