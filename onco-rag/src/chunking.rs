//! Text chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`CharWindowChunker`] — whitespace-normalized sliding window by character count
//! - [`TokenWindowChunker`] — sliding window by whitespace-token count
//!
//! Both are pure: the same input always yields the same sequence of chunks.

use crate::error::{RagError, Result};

/// A strategy for splitting document text into overlapping chunks.
///
/// Implementations produce plain chunk strings; embeddings are attached
/// later by the ingestion pipeline. Empty or all-whitespace input produces
/// an empty `Vec`, not an error.
pub trait Chunker: Send + Sync {
    /// Split text into an ordered sequence of chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

fn validate_window(window: usize, overlap: usize) -> Result<()> {
    if window == 0 {
        return Err(RagError::invalid("window", "window size must be greater than zero"));
    }
    if overlap >= window {
        return Err(RagError::invalid(
            "overlap",
            format!("overlap ({overlap}) must be smaller than window size ({window})"),
        ));
    }
    Ok(())
}

/// Splits whitespace-normalized text into fixed-size character windows.
///
/// Runs of whitespace are collapsed to single spaces and the text is trimmed
/// before windowing. The window advances by `window - overlap` characters;
/// the final chunk may be shorter than `window`.
///
/// # Example
///
/// ```rust,ignore
/// use onco_rag::CharWindowChunker;
///
/// let chunker = CharWindowChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone)]
pub struct CharWindowChunker {
    window: usize,
    overlap: usize,
}

impl CharWindowChunker {
    /// Create a new `CharWindowChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `window == 0` or
    /// `overlap >= window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        validate_window(window, overlap)?;
        Ok(Self { window, overlap })
    }
}

impl Chunker for CharWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        // Collapse whitespace runs to single spaces, then window over chars
        // (not bytes) so multi-byte text never splits mid-character.
        let normalized: Vec<char> =
            text.split_whitespace().collect::<Vec<_>>().join(" ").chars().collect();
        if normalized.is_empty() {
            return Vec::new();
        }

        let step = self.window - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < normalized.len() {
            let end = (start + self.window).min(normalized.len());
            chunks.push(normalized[start..end].iter().collect());
            if end == normalized.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Splits text into fixed-size windows of whitespace-separated tokens.
///
/// Each window's tokens are re-joined with single spaces. The window
/// advances by `window - overlap` tokens; the final chunk may contain
/// fewer than `window` tokens.
#[derive(Debug, Clone)]
pub struct TokenWindowChunker {
    window: usize,
    overlap: usize,
}

impl TokenWindowChunker {
    /// Create a new `TokenWindowChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `window == 0` or
    /// `overlap >= window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        validate_window(window, overlap)?;
        Ok(Self { window, overlap })
    }
}

impl Chunker for TokenWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let step = self.window - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let end = (start + self.window).min(tokens.len());
            chunks.push(tokens[start..end].join(" "));
            if end == tokens.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
