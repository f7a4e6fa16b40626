//! Retrieval pipeline for oncology documents.
//!
//! `onco-rag` turns raw document bytes into reproducible chunk vectors and
//! answers approximate-nearest-neighbour queries over them:
//!
//! - [`Chunker`] strategies split normalized text into overlapping windows.
//! - [`EmbeddingProvider`] strategies produce deterministic fixed-dimension
//!   vectors ([`HashBucketEmbedder`] is the unit-norm production default).
//! - [`ChunkStore`] is the narrow storage seam; [`PgVectorStore`] is the
//!   pgvector-backed production backend, [`InMemoryStore`] the test double.
//! - [`IngestPipeline`] orchestrates digest → extract → chunk → embed →
//!   upsert with idempotent keys.
//! - [`Retriever`] implements [`SearchService`] for query-time retrieval.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod inmemory;
pub mod pgvector;
pub mod pipeline;
pub mod search;
pub mod store;

pub use chunking::{CharWindowChunker, Chunker, TokenWindowChunker};
pub use config::{DATABASE_URL_ENV, MAX_TOP_K, PipelineConfig, PipelineConfigBuilder, database_url};
pub use document::{ChunkMatch, ChunkRecord, DocumentMeta, DocumentRef, content_digest};
pub use embedding::{
    DEFAULT_DIMENSIONS, EmbeddingProvider, EmbeddingStrategy, HashBucketEmbedder,
    HashSeededEmbedder,
};
pub use error::{RagError, Result};
pub use extract::{PlainTextExtractor, TextExtractor};
pub use inmemory::InMemoryStore;
pub use pgvector::PgVectorStore;
pub use pipeline::{
    DocumentInput, DocumentOutcome, IngestPipeline, IngestPipelineBuilder, IngestReport,
    IngestStatus, PreparedDocument,
};
pub use search::{Retriever, SearchService, validate_query};
pub use store::ChunkStore;
