use std::fmt;

use crate::error::LlmError;
use crate::openai::OpenAiBackend;
use crate::provider::{Completion, Message, ModelBackend};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "phi3";

/// Self-hosted servers speaking the OpenAI protocol accept any bearer token;
/// Ollama documents this value.
pub const PLACEHOLDER_API_KEY: &str = "ollama";

/// Local or self-hosted chat endpoint (Ollama, llama.cpp server, vLLM) keyed
/// by a fixed placeholder credential.
#[derive(Clone)]
pub struct LocalBackend {
    inner: OpenAiBackend,
}

impl LocalBackend {
    #[must_use]
    pub fn new(base_url: String, model: String) -> Self {
        let inner =
            OpenAiBackend::new(PLACEHOLDER_API_KEY.into(), base_url, model).with_name("local");
        Self { inner }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.inner = self.inner.with_max_tokens(max_tokens);
        self
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.into(), DEFAULT_MODEL.into())
    }
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ModelBackend for LocalBackend {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        self.inner.complete(messages).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
