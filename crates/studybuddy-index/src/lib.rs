//! Study-guide index: data model, Elasticsearch and in-memory backends, hybrid
//! retrieval and the offline corpus indexer.

pub mod backend;
pub mod corpus;
pub mod elastic;
pub mod error;
pub mod in_memory;
pub mod indexer;
pub mod mapping;
pub mod query;
pub mod retriever;
pub mod types;

pub use backend::IndexBackend;
pub use corpus::load_corpus;
pub use elastic::ElasticsearchBackend;
pub use error::{IndexError, RetrievalError};
pub use in_memory::InMemoryBackend;
pub use indexer::{CorpusIndexer, IndexReport, RetryPolicy};
pub use query::{HybridQuery, ScoringWeights};
pub use retriever::{HybridRetriever, RetrievalConfig};
pub use types::{CorpusRecord, DocumentChunk, SearchResult};
