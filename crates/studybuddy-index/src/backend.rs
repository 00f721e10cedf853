use std::future::Future;
use std::pin::Pin;

use crate::error::{IndexError, RetrievalError};
use crate::mapping::{IndexDefinition, IndexInfo};
use crate::query::HybridQuery;
use crate::types::{DocumentChunk, SearchResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage and search over study-guide chunks.
///
/// Object-safe so the retriever and indexer can hold `Arc<dyn IndexBackend>`.
pub trait IndexBackend: Send + Sync {
    /// Succeeds once the backend accepts requests.
    fn ping(&self) -> BoxFuture<'_, Result<(), IndexError>>;

    /// Drop `index` if it exists and create it from `definition`.
    fn recreate_index(
        &self,
        index: &str,
        definition: IndexDefinition,
    ) -> BoxFuture<'_, Result<(), IndexError>>;

    /// Store chunks and make them visible to search. Returns the count stored.
    fn index_documents(
        &self,
        index: &str,
        chunks: Vec<DocumentChunk>,
    ) -> BoxFuture<'_, Result<usize, IndexError>>;

    /// Run a hybrid query, best hit first, at most `query.size` hits.
    fn search(
        &self,
        index: &str,
        query: HybridQuery,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>, RetrievalError>>;

    /// Vector dimension and embedding model recorded for `index`.
    fn index_info(&self, index: &str) -> BoxFuture<'_, Result<IndexInfo, RetrievalError>>;
}
