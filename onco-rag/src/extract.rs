//! Plain-text extraction from raw document bytes.
//!
//! Format-specific extraction (PDF, HTML, ...) is an external collaborator;
//! the pipeline only sees the [`TextExtractor`] trait. The default
//! [`PlainTextExtractor`] handles text files.

use crate::error::{RagError, Result};

/// Extracts plain text from a source document's raw bytes.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`. The `source` name is used in error context.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] when the bytes cannot be read as the
    /// expected format; the pipeline skips the document and continues.
    fn extract(&self, source: &str, bytes: &[u8]) -> Result<String>;
}

/// Treats the source bytes as UTF-8 text, replacing invalid sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, _source: &str, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// An extractor that always fails. Useful in tests exercising the
/// skip-and-report path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, source: &str, _bytes: &[u8]) -> Result<String> {
        Err(RagError::Extraction {
            document: source.to_string(),
            message: "unsupported document format".to_string(),
        })
    }
}
