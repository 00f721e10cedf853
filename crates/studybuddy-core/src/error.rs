use studybuddy_index::RetrievalError;
use studybuddy_llm::{EmbedError, LlmError};

use crate::pipeline::Stage;

/// Reason a question went unanswered. Every variant aborts the whole call.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("no model backend selected")]
    NotConfigured,

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
}

impl RagError {
    /// Stage that raised the error; `None` when no stage ran.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::NotConfigured => None,
            Self::Embedding(_) => Some(Stage::Embed),
            Self::Retrieval(_) => Some(Stage::Retrieve),
            Self::Generation(_) => Some(Stage::Generate),
        }
    }
}
