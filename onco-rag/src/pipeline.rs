//! Ingestion pipeline: digest → extract → chunk → embed → upsert.
//!
//! The [`IngestPipeline`] composes a [`TextExtractor`], a [`Chunker`], an
//! [`EmbeddingProvider`], and an optional [`ChunkStore`]. Ingestion is
//! idempotent: the document digest and `(document_id, chunk_ix)` upsert keys
//! mean re-running over identical bytes updates rows instead of duplicating
//! them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use onco_rag::{IngestPipeline, CharWindowChunker, HashBucketEmbedder, InMemoryStore};
//!
//! let pipeline = IngestPipeline::builder()
//!     .chunker(Arc::new(CharWindowChunker::new(1000, 200)?))
//!     .embedder(Arc::new(HashBucketEmbedder::new(1536)?))
//!     .store(Arc::new(InMemoryStore::new()))
//!     .build()?;
//!
//! let report = pipeline.ingest_batch(inputs).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::chunking::Chunker;
use crate::document::{ChunkRecord, DocumentMeta, content_digest};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::store::ChunkStore;

/// A source document handed to the pipeline.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Display title (for files, typically the path).
    pub title: String,
    /// Source label (e.g. "pubmed-central", "local-file").
    pub source: String,
    /// Cancer-type classification, when known.
    pub cancer_type: Option<String>,
    /// Origin URL, when known.
    pub url: Option<String>,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// The pure-computation result for one document: metadata plus embedded
/// chunk records, ready to persist (or to retry persisting).
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Digest-keyed document metadata.
    pub meta: DocumentMeta,
    /// Chunk records in `chunk_ix` order.
    pub records: Vec<ChunkRecord>,
}

/// How one document fared during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Document and all chunk rows were upserted.
    Persisted,
    /// Chunks were computed but not written: no store configured or the
    /// store was unreachable. The outcome retains the prepared records so
    /// the caller can retry without recomputation.
    SkippedPersistence,
    /// The document could not be read or extracted; the batch continued.
    Failed,
}

/// Per-document ingestion outcome.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Display title of the document.
    pub title: String,
    /// Number of chunks produced (0 for failed documents).
    pub chunk_count: usize,
    /// What happened to the document.
    pub status: IngestStatus,
    /// The prepared records, retained when persistence was skipped.
    pub prepared: Option<PreparedDocument>,
    /// The error message for failed documents.
    pub error: Option<String>,
}

/// Summary of one batch ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Per-document outcomes, in input order.
    pub outcomes: Vec<DocumentOutcome>,
    /// Total chunk rows upserted across the batch.
    pub chunks_persisted: usize,
}

impl IngestReport {
    /// Count documents with the given status.
    pub fn count(&self, status: IngestStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// The ingestion pipeline orchestrator. Construct via
/// [`IngestPipeline::builder()`].
pub struct IngestPipeline {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TextExtractor>,
    store: Option<Arc<dyn ChunkStore>>,
    store_timeout: Duration,
}

impl IngestPipeline {
    /// Create a new [`IngestPipelineBuilder`].
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    /// Run the pure computation stages for one document: content digest,
    /// text extraction, chunking, and embedding. No store access.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] when the document cannot be read;
    /// chunking and embedding are total over valid configuration.
    pub async fn prepare(&self, input: &DocumentInput) -> Result<PreparedDocument> {
        let sha256 = content_digest(&input.bytes);
        let text = self.extractor.extract(&input.title, &input.bytes)?;
        let chunks = self.chunker.chunk(&text);

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ix, (text, embedding))| ChunkRecord {
                chunk_ix: ix as i32,
                text,
                embedding,
                source: None,
            })
            .collect();

        Ok(PreparedDocument {
            meta: DocumentMeta {
                title: input.title.clone(),
                source: input.source.clone(),
                cancer_type: input.cancer_type.clone(),
                url: input.url.clone(),
                sha256,
            },
            records,
        })
    }

    /// Persist a prepared document: upsert the document row, then all chunk
    /// rows in one transaction. Safe to call again with the same records.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotConfigured`] without a store,
    /// [`RagError::Timeout`] when the store misses the deadline, and store
    /// errors otherwise.
    pub async fn persist(&self, prepared: &PreparedDocument) -> Result<usize> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| RagError::NotConfigured("no chunk store configured".to_string()))?;

        let document_id = tokio::time::timeout(self.store_timeout, store.upsert_document(&prepared.meta))
            .await
            .map_err(|_| RagError::Timeout { operation: "document upsert".to_string() })??;

        tokio::time::timeout(
            self.store_timeout,
            store.upsert_chunks(document_id, &prepared.records),
        )
        .await
        .map_err(|_| RagError::Timeout { operation: "chunk upsert".to_string() })??;

        info!(
            document_id,
            title = %prepared.meta.title,
            chunk_count = prepared.records.len(),
            "ingested document"
        );
        Ok(prepared.records.len())
    }

    /// Ingest one document end to end.
    ///
    /// Extraction failure yields a `Failed` outcome. An unreachable or
    /// unconfigured store yields `SkippedPersistence` with the prepared
    /// records retained; other store errors propagate.
    pub async fn ingest_document(&self, input: &DocumentInput) -> Result<DocumentOutcome> {
        let prepared = match self.prepare(input).await {
            Ok(prepared) => prepared,
            Err(e @ RagError::Extraction { .. }) => {
                warn!(title = %input.title, error = %e, "skipping document");
                return Ok(DocumentOutcome {
                    title: input.title.clone(),
                    chunk_count: 0,
                    status: IngestStatus::Failed,
                    prepared: None,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        };

        let chunk_count = prepared.records.len();
        match self.persist(&prepared).await {
            Ok(persisted) => Ok(DocumentOutcome {
                title: input.title.clone(),
                chunk_count: persisted,
                status: IngestStatus::Persisted,
                prepared: None,
                error: None,
            }),
            Err(e @ (RagError::NotConfigured(_) | RagError::StoreUnavailable { .. })) => {
                warn!(title = %input.title, error = %e, "persistence skipped; chunk records retained");
                Ok(DocumentOutcome {
                    title: input.title.clone(),
                    chunk_count,
                    status: IngestStatus::SkippedPersistence,
                    prepared: Some(prepared),
                    error: Some(e.to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Ingest a batch of documents, skipping failed ones and continuing.
    pub async fn ingest_batch(&self, inputs: &[DocumentInput]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for input in inputs {
            let outcome = self.ingest_document(input).await?;
            if outcome.status == IngestStatus::Persisted {
                report.chunks_persisted += outcome.chunk_count;
            }
            report.outcomes.push(outcome);
        }
        Ok(report)
    }
}

/// Builder for constructing an [`IngestPipeline`].
///
/// `chunker` and `embedder` are required; the extractor defaults to
/// [`PlainTextExtractor`] and the store may be omitted for compute-only runs.
#[derive(Default)]
pub struct IngestPipelineBuilder {
    chunker: Option<Arc<dyn Chunker>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    extractor: Option<Arc<dyn TextExtractor>>,
    store: Option<Arc<dyn ChunkStore>>,
    store_timeout: Option<Duration>,
}

impl IngestPipelineBuilder {
    /// Set the chunking strategy.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the text extractor (defaults to [`PlainTextExtractor`]).
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the chunk store. Omitting it makes ingestion compute-only.
    pub fn store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the deadline for each store operation (default 30s).
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Build the [`IngestPipeline`], validating required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the chunker or embedder is missing.
    pub fn build(self) -> Result<IngestPipeline> {
        let chunker =
            self.chunker.ok_or_else(|| RagError::Config("chunker is required".to_string()))?;
        let embedder =
            self.embedder.ok_or_else(|| RagError::Config("embedder is required".to_string()))?;

        Ok(IngestPipeline {
            chunker,
            embedder,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(PlainTextExtractor)),
            store: self.store,
            store_timeout: self.store_timeout.unwrap_or(Duration::from_secs(30)),
        })
    }
}
