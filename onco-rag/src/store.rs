//! Chunk store trait for persisting and searching embedded chunks.

use async_trait::async_trait;

use crate::document::{ChunkMatch, ChunkRecord, DocumentMeta};
use crate::error::Result;

/// A persistent collection of chunk vectors queryable by nearest neighbour.
///
/// Implementations own the storage engine; the pipeline and orchestrator see
/// only this narrow interface, so the real pgvector backend and the
/// in-memory test double are interchangeable.
///
/// # Example
///
/// ```rust,ignore
/// use onco_rag::{ChunkStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// let document_id = store.upsert_document(&meta).await?;
/// store.upsert_chunks(document_id, &records).await?;
/// let matches = store.query_nearest(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or update a document keyed by its content digest.
    ///
    /// On digest conflict only mutable display fields (the title) are
    /// updated; the document's identity is preserved. Returns the
    /// store-assigned document id.
    async fn upsert_document(&self, meta: &DocumentMeta) -> Result<i64>;

    /// Upsert chunk rows keyed by `(document_id, chunk_ix)`.
    ///
    /// All rows for one call commit together or not at all, so a cancelled
    /// ingestion never leaves a half-written chunk.
    async fn upsert_chunks(&self, document_id: i64, records: &[ChunkRecord]) -> Result<()>;

    /// Return at most `top_k` chunks nearest to `embedding`, descending by
    /// similarity, each joined with its document's display attributes.
    ///
    /// An empty store yields an empty `Vec`. Equal-distance ties have
    /// undefined order.
    async fn query_nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ChunkMatch>>;

    /// Count the chunks currently persisted.
    async fn chunk_count(&self) -> Result<u64>;
}
