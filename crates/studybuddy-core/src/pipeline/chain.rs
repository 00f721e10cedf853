use std::sync::Arc;

use studybuddy_index::HybridRetriever;
use studybuddy_llm::{Embedder, ModelBackend};

use super::step::Step;
use super::steps::{AugmentStep, EmbedStep, GenerateStep, RagOutcome, RetrieveStep};
use crate::error::RagError;
use crate::generator::Generator;

/// Embed → retrieve → augment → generate. The first failing stage ends the
/// chain; nothing after it runs.
pub struct AnswerChain<E, B> {
    embed: EmbedStep<E>,
    retrieve: RetrieveStep,
    augment: AugmentStep,
    generate: GenerateStep<B>,
}

impl<E: Embedder, B: ModelBackend> AnswerChain<E, B> {
    #[must_use]
    pub fn new(embedder: Arc<E>, retriever: Arc<HybridRetriever>, generator: Generator<B>) -> Self {
        Self {
            embed: EmbedStep::new(embedder),
            retrieve: RetrieveStep::new(retriever),
            augment: AugmentStep,
            generate: GenerateStep::new(generator),
        }
    }

    /// Records the failing stage as `failed_stage` on the current span when
    /// that span declares the field.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub async fn run(&self, question: String) -> Result<RagOutcome, RagError> {
        let embedded = run_stage(&self.embed, question).await?;
        let retrieved = run_stage(&self.retrieve, embedded).await?;
        let augmented = run_stage(&self.augment, retrieved).await?;
        run_stage(&self.generate, augmented).await
    }
}

async fn run_stage<S: Step>(step: &S, input: S::Input) -> Result<S::Output, RagError> {
    let result = step.run(input).await;
    if let Err(e) = &result {
        tracing::Span::current().record("failed_stage", S::STAGE.as_str());
        tracing::debug!(stage = %S::STAGE, error = %e, "stage failed");
    }
    result
}
