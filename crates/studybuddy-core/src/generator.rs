use std::time::Instant;

use studybuddy_llm::{LlmError, Message, ModelBackend, Usage};

/// A completed answer with the backend's token accounting and wall-clock latency.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub answer: String,
    pub usage: Option<Usage>,
    /// Seconds spent waiting for the backend.
    pub latency: f64,
}

impl Generation {
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Usage>, f64) {
        (self.answer, self.usage, self.latency)
    }
}

/// Sends a rendered prompt as a single user message. One attempt, no retry.
#[derive(Debug, Clone)]
pub struct Generator<B> {
    backend: B,
}

impl<B: ModelBackend> Generator<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// # Errors
    ///
    /// Returns the backend's [`LlmError`] unchanged.
    pub async fn generate(&self, prompt: &str) -> Result<Generation, LlmError> {
        let started = Instant::now();
        let completion = self.backend.complete(&[Message::user(prompt)]).await?;
        let latency = started.elapsed().as_secs_f64();

        tracing::debug!(
            backend = self.backend.name(),
            model = self.backend.model(),
            latency_secs = latency,
            usage = ?completion.usage,
            "generation complete"
        );

        Ok(Generation {
            answer: completion.text,
            usage: completion.usage,
            latency,
        })
    }
}
