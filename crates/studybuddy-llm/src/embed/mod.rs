//! Text embedders used both when building the index and at query time.

#[cfg(feature = "candle")]
pub mod candle;
pub mod ollama;

use std::future::Future;

use crate::error::EmbedError;
#[cfg(feature = "mock")]
use crate::mock::MockEmbedder;

#[cfg(feature = "candle")]
pub use self::candle::CandleEmbedder;
pub use self::ollama::OllamaEmbedder;

const DIMENSION_PROBE: &str = "dimension probe";

/// Turns text into a fixed-length dense vector.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be reached or inference fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbedError>> + Send;

    /// Output dimension of the model. The default implementation embeds a probe string.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe embedding fails or comes back empty.
    fn dimension(&self) -> impl Future<Output = Result<usize, EmbedError>> + Send {
        async move {
            let probe = self.embed(DIMENSION_PROBE).await?;
            if probe.is_empty() {
                return Err(EmbedError::EmptyResponse {
                    provider: self.model_name().to_owned(),
                });
            }
            Ok(probe.len())
        }
    }

    /// Identifier of the embedding model, recorded in the index metadata.
    fn model_name(&self) -> &str;
}

macro_rules! delegate_embedder {
    ($self:expr, |$e:ident| $expr:expr) => {
        match $self {
            AnyEmbedder::Ollama($e) => $expr,
            #[cfg(feature = "candle")]
            AnyEmbedder::Candle($e) => $expr,
            #[cfg(feature = "mock")]
            AnyEmbedder::Mock($e) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyEmbedder {
    Ollama(OllamaEmbedder),
    #[cfg(feature = "candle")]
    Candle(CandleEmbedder),
    #[cfg(feature = "mock")]
    Mock(MockEmbedder),
}

impl Embedder for AnyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        delegate_embedder!(self, |e| e.embed(text).await)
    }

    async fn dimension(&self) -> Result<usize, EmbedError> {
        delegate_embedder!(self, |e| e.dimension().await)
    }

    fn model_name(&self) -> &str {
        delegate_embedder!(self, |e| e.model_name())
    }
}
