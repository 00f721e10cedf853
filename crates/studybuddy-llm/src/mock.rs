//! Test-only mock backend and embedder.

use std::sync::{Arc, Mutex};

use crate::embed::Embedder;
use crate::error::{EmbedError, LlmError};
use crate::provider::{Completion, Message, ModelBackend, Usage};

#[derive(Debug, Clone)]
pub struct MockBackend {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
    pub default_response: String,
    pub usage: Option<Usage>,
    pub fail: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
                ..Usage::default()
            }),
            fail: false,
            delay_ms: 0,
        }
    }
}

impl MockBackend {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn without_usage(mut self) -> Self {
        self.usage = None;
        self
    }

    /// Conversations received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelBackend for MockBackend {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let text = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                self.default_response.clone()
            } else {
                responses.remove(0)
            }
        };
        Ok(Completion {
            text,
            usage: self.usage.clone(),
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic embedder. Returns a fixed vector, or one derived from the
/// text's bytes when built with [`MockEmbedder::hashing`].
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dimension: usize,
    pub embedding: Option<Vec<f32>>,
    pub fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimension: 384,
            embedding: None,
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn fixed(embedding: Vec<f32>) -> Self {
        Self {
            dimension: embedding.len(),
            embedding: Some(embedding),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn hashing(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Texts embedded so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Folds the text's bytes into `dimension` buckets and L2-normalizes. Empty
/// text maps to the first basis vector.
fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0.0_f32; dimension];
    for (i, b) in text.bytes().enumerate() {
        v[i % dimension] += f32::from(b);
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    } else {
        v[0] = 1.0;
    }
    v
}

impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.lock().unwrap().push(text.to_owned());
        if self.fail {
            return Err(EmbedError::Request("mock embedding error".into()));
        }
        if let Some(embedding) = &self.embedding {
            return Ok(embedding.clone());
        }
        Ok(hash_embedding(text, self.dimension))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}
