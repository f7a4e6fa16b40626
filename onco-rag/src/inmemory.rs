//! In-memory chunk store using brute-force cosine similarity.
//!
//! [`InMemoryStore`] keeps documents and chunks in maps behind a
//! `tokio::sync::RwLock`. It implements the same upsert keys as the pgvector
//! backend (document digest, `(document_id, chunk_ix)`), which makes it a
//! faithful stand-in for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{ChunkMatch, ChunkRecord, DocumentMeta, DocumentRef};
use crate::error::Result;
use crate::store::ChunkStore;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Debug, Clone)]
struct StoredChunk {
    chunk_id: i64,
    record: ChunkRecord,
}

#[derive(Debug, Default)]
struct Inner {
    /// Document id by content digest.
    digests: HashMap<String, i64>,
    documents: HashMap<i64, DocumentMeta>,
    /// Chunks keyed by `(document_id, chunk_ix)`.
    chunks: HashMap<(i64, i32), StoredChunk>,
    next_document_id: i64,
    next_chunk_id: i64,
}

/// An in-memory [`ChunkStore`] using cosine similarity for search.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn upsert_document(&self, meta: &DocumentMeta) -> Result<i64> {
        let mut inner = self.inner.write().await;
        if let Some(&id) = inner.digests.get(&meta.sha256) {
            // Digest conflict: identity preserved, only the title refreshed.
            if let Some(existing) = inner.documents.get_mut(&id) {
                existing.title = meta.title.clone();
            }
            return Ok(id);
        }
        inner.next_document_id += 1;
        let id = inner.next_document_id;
        inner.digests.insert(meta.sha256.clone(), id);
        inner.documents.insert(id, meta.clone());
        Ok(id)
    }

    async fn upsert_chunks(&self, document_id: i64, records: &[ChunkRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for record in records {
            let key = (document_id, record.chunk_ix);
            if let Some(stored) = inner.chunks.get_mut(&key) {
                stored.record = record.clone();
                continue;
            }
            inner.next_chunk_id += 1;
            let chunk_id = inner.next_chunk_id;
            inner.chunks.insert(key, StoredChunk { chunk_id, record: record.clone() });
        }
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ChunkMatch>> {
        let inner = self.inner.read().await;

        let mut scored: Vec<ChunkMatch> = inner
            .chunks
            .iter()
            .filter_map(|(&(document_id, _), stored)| {
                let meta = inner.documents.get(&document_id)?;
                Some(ChunkMatch {
                    chunk_id: stored.chunk_id,
                    text: stored.record.text.clone(),
                    score: cosine_similarity(&stored.record.embedding, embedding),
                    document: DocumentRef {
                        id: document_id,
                        title: meta.title.clone(),
                        source: meta.source.clone(),
                        cancer_type: meta.cancer_type.clone(),
                    },
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn chunk_count(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.chunks.len() as u64)
    }
}
