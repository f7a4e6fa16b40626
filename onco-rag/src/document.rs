//! Data types for documents, chunk records, and search matches.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata for a source document, keyed by the digest of its raw bytes.
///
/// The `sha256` digest is the document's natural key: ingesting identical
/// bytes twice resolves to the same row, with mutable display fields
/// (the title) updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    /// Display title for the document.
    pub title: String,
    /// Label for where the document came from (e.g. "pubmed-central").
    pub source: String,
    /// Cancer-type classification, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancer_type: Option<String>,
    /// Origin URL, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Hex-encoded SHA-256 digest of the raw document bytes.
    pub sha256: String,
}

/// Denormalized display attributes of a match's owning document.
///
/// Optional fields that are absent in the store surface as `None`,
/// distinguishing "missing" from "empty".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRef {
    /// The document's store-assigned identifier.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Source label.
    pub source: String,
    /// Cancer-type classification, when known.
    pub cancer_type: Option<String>,
}

/// A chunk of document text paired with its embedding, ready for persistence.
///
/// `(document_id, chunk_ix)` is the upsert key: re-ingesting a document
/// overwrites rows rather than duplicating them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// 0-based position of this chunk within its document.
    pub chunk_ix: i32,
    /// The chunk's text content.
    pub text: String,
    /// The embedding vector for this chunk's text.
    pub embedding: Vec<f32>,
    /// Optional per-chunk source label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A retrieved chunk paired with a similarity score and its document.
///
/// Constructed fresh per query; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    /// The store-assigned identifier of the matched chunk.
    pub chunk_id: i64,
    /// The chunk's text content.
    pub text: String,
    /// Similarity score (higher is more relevant).
    pub score: f32,
    /// Display attributes of the owning document.
    pub document: DocumentRef,
}

/// Compute the hex-encoded SHA-256 digest of raw document bytes.
pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
