//! Chat-completion backends and text embedders.

pub mod any;
pub mod embed;
pub mod error;
pub mod http;
pub mod local;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use any::AnyBackend;
pub use embed::{AnyEmbedder, Embedder};
pub use error::{EmbedError, LlmError};
pub use provider::{Completion, Message, ModelBackend, Role, Usage};
