//! Configuration, prompt building, generation and the RAG pipeline.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod rag;
pub mod session;

pub use config::Config;
pub use error::RagError;
pub use generator::{Generation, Generator};
pub use rag::Rag;
pub use session::ChatSession;
