//! The four stages of answering: embed, retrieve, augment, generate.

use std::sync::Arc;

use studybuddy_index::{HybridRetriever, SearchResult};
use studybuddy_llm::{Embedder, ModelBackend};

use super::step::{Stage, Step};
use crate::error::RagError;
use crate::generator::{Generation, Generator};
use crate::prompt::augment;

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedQuestion {
    pub question: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub question: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Augmented {
    pub results: Vec<SearchResult>,
    pub prompt: String,
}

/// Everything produced while answering one question.
#[derive(Debug, Clone, PartialEq)]
pub struct RagOutcome {
    pub generation: Generation,
    pub results: Vec<SearchResult>,
    pub prompt: String,
}

pub struct EmbedStep<E> {
    embedder: Arc<E>,
}

impl<E> EmbedStep<E> {
    #[must_use]
    pub fn new(embedder: Arc<E>) -> Self {
        Self { embedder }
    }
}

impl<E: Embedder> Step for EmbedStep<E> {
    const STAGE: Stage = Stage::Embed;

    type Input = String;
    type Output = EmbeddedQuestion;

    async fn run(&self, question: Self::Input) -> Result<Self::Output, RagError> {
        let vector = self.embedder.embed(&question).await?;
        tracing::debug!(dims = vector.len(), "question embedded");
        Ok(EmbeddedQuestion { question, vector })
    }
}

pub struct RetrieveStep {
    retriever: Arc<HybridRetriever>,
}

impl RetrieveStep {
    #[must_use]
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

impl Step for RetrieveStep {
    const STAGE: Stage = Stage::Retrieve;

    type Input = EmbeddedQuestion;
    type Output = Retrieved;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, RagError> {
        let results = self
            .retriever
            .retrieve(&input.question, &input.vector)
            .await?;
        Ok(Retrieved {
            question: input.question,
            results,
        })
    }
}

pub struct AugmentStep;

impl Step for AugmentStep {
    const STAGE: Stage = Stage::Augment;

    type Input = Retrieved;
    type Output = Augmented;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, RagError> {
        let prompt = augment(&input.question, &input.results);
        tracing::debug!(
            prompt_chars = prompt.len(),
            results = input.results.len(),
            "prompt rendered"
        );
        Ok(Augmented {
            results: input.results,
            prompt,
        })
    }
}

pub struct GenerateStep<B> {
    generator: Generator<B>,
}

impl<B: ModelBackend> GenerateStep<B> {
    #[must_use]
    pub fn new(generator: Generator<B>) -> Self {
        Self { generator }
    }
}

impl<B: ModelBackend> Step for GenerateStep<B> {
    const STAGE: Stage = Stage::Generate;

    type Input = Augmented;
    type Output = RagOutcome;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, RagError> {
        let generation = self.generator.generate(&input.prompt).await?;
        Ok(RagOutcome {
            generation,
            results: input.results,
            prompt: input.prompt,
        })
    }
}
