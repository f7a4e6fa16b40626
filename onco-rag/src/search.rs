//! Search orchestration: query text → embedding → nearest-neighbour matches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::MAX_TOP_K;
use crate::document::ChunkMatch;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::store::ChunkStore;

/// Anything that can answer a ranked chunk search.
///
/// The HTTP layer depends on this trait rather than a concrete backend, so
/// the store-backed [`Retriever`] and in-memory test doubles are
/// interchangeable.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Return the `top_k` best-matching chunks for `query`, descending by
    /// similarity score.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ChunkMatch>>;
}

/// The production [`SearchService`]: embeds the query with the same provider
/// configuration used at ingestion time and delegates to the chunk store.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ChunkStore>,
    store_timeout: Duration,
}

impl Retriever {
    /// Create a new retriever over the given embedder and store.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ChunkStore>,
        store_timeout: Duration,
    ) -> Self {
        Self { embedder, store, store_timeout }
    }
}

/// Validate the caller-supplied search parameters.
///
/// # Errors
///
/// Returns [`RagError::InvalidParameter`] for an empty query or a `top_k`
/// outside `1..=MAX_TOP_K`. Out-of-range `top_k` fails rather than clamping
/// so caller errors surface early.
pub fn validate_query(query: &str, top_k: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RagError::invalid("query", "query must not be empty"));
    }
    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(RagError::invalid(
            "top_k",
            format!("top_k ({top_k}) must be between 1 and {MAX_TOP_K}"),
        ));
    }
    Ok(())
}

#[async_trait]
impl SearchService for Retriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ChunkMatch>> {
        validate_query(query, top_k)?;

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;

        let matches = tokio::time::timeout(
            self.store_timeout,
            self.store.query_nearest(&query_embedding, top_k),
        )
        .await
        .map_err(|_| RagError::Timeout { operation: "nearest-neighbour query".to_string() })?
        .map_err(|e| {
            error!(error = %e, "nearest-neighbour query failed");
            e
        })?;

        info!(top_k, result_count = matches.len(), "search completed");
        Ok(matches)
    }
}
