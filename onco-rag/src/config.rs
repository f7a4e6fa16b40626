//! Configuration for the retrieval pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embedding::DEFAULT_DIMENSIONS;
use crate::error::{RagError, Result};

/// The environment variable holding the Postgres connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Upper bound on `top_k` for any search request.
pub const MAX_TOP_K: usize = 50;

/// Configuration parameters shared by ingestion and search.
///
/// The embedding strategy itself lives on the [`EmbeddingProvider`]; the
/// pgvector backend reads dimensionality and strategy from the provider and
/// fails fast when the store disagrees.
///
/// [`EmbeddingProvider`]: crate::embedding::EmbeddingProvider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Chunk window size (characters or tokens, depending on the chunker).
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Embedding dimensionality, used to construct the provider.
    pub dimensions: usize,
    /// Default number of results when a caller does not specify `top_k`.
    pub default_top_k: usize,
    /// Deadline for any single store-touching operation.
    pub store_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            dimensions: DEFAULT_DIMENSIONS,
            default_top_k: 5,
            store_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the chunk window size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the embedding dimensionality.
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.config.dimensions = dimensions;
        self
    }

    /// Set the default number of search results.
    pub fn default_top_k(mut self, top_k: usize) -> Self {
        self.config.default_top_k = top_k;
        self
    }

    /// Set the deadline for store-touching operations.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `dimensions == 0`
    /// - `default_top_k` is zero or above [`MAX_TOP_K`]
    pub fn build(self) -> Result<PipelineConfig> {
        let config = self.config;
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.dimensions == 0 {
            return Err(RagError::Config("dimensions must be greater than zero".to_string()));
        }
        if config.default_top_k == 0 || config.default_top_k > MAX_TOP_K {
            return Err(RagError::Config(format!(
                "default_top_k ({}) must be between 1 and {MAX_TOP_K}",
                config.default_top_k
            )));
        }
        Ok(config)
    }
}

/// Read the Postgres connection string from `DATABASE_URL`.
///
/// Store-dependent components call this at startup so a missing connection
/// string fails fast rather than deep inside a request.
///
/// # Errors
///
/// Returns [`RagError::NotConfigured`] if the variable is unset or empty.
pub fn database_url() -> Result<String> {
    match std::env::var(DATABASE_URL_ENV) {
        Ok(url) if !url.is_empty() => Ok(url),
        _ => Err(RagError::NotConfigured(format!(
            "{DATABASE_URL_ENV} environment variable must be set for store-backed operation"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let result = PipelineConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let result = PipelineConfig::builder().dimensions(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_top_k_out_of_bounds() {
        assert!(PipelineConfig::builder().default_top_k(0).build().is_err());
        assert!(PipelineConfig::builder().default_top_k(MAX_TOP_K + 1).build().is_err());
        assert!(PipelineConfig::builder().default_top_k(MAX_TOP_K).build().is_ok());
    }
}
