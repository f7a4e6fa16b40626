//! Deterministic embedding providers.
//!
//! Two strategies with the same contract — identical input always yields
//! bit-identical output, which makes re-ingestion idempotent and lets tests
//! assert on exact vectors:
//!
//! - [`HashBucketEmbedder`] — per-token SHA-256 bucket accumulation with L2
//!   normalization. Unit-norm output matches the cosine-distance query path,
//!   so this is the production default.
//! - [`HashSeededEmbedder`] — a SHA-256 digest of the text seeds a PRNG that
//!   draws uniform components. Not unit-norm; inner-product semantics.
//!
//! Neither strategy touches the network or disk.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends with
/// native batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Return the strategy tag stored alongside persisted vectors, used to
    /// detect ingest/query configuration mismatches at startup.
    fn strategy(&self) -> EmbeddingStrategy;
}

/// Names the deterministic embedding strategies.
///
/// The tag is persisted with the store's schema metadata so that a store
/// written under one strategy refuses queries configured with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingStrategy {
    /// Token-hash bucket accumulation, L2-normalized.
    HashBucket,
    /// Hash-seeded pseudo-random uniform components.
    HashSeeded,
}

impl EmbeddingStrategy {
    /// The tag persisted in the store's embedding metadata row.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashBucket => "hash-bucket",
            Self::HashSeeded => "hash-seeded",
        }
    }
}

impl std::fmt::Display for EmbeddingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The default embedding dimensionality, matching a `vector(1536)` column.
pub const DEFAULT_DIMENSIONS: usize = 1536;

fn validate_dimensions(dimensions: usize) -> Result<()> {
    if dimensions == 0 {
        return Err(RagError::invalid("dimensions", "embedding dimensionality must be positive"));
    }
    Ok(())
}

/// Token-hash bucket embedder with unit-norm output.
///
/// Tokens are lowercased and whitespace-split. Each token's SHA-256 digest
/// selects a bucket (first four digest bytes, big-endian, modulo the
/// dimensionality) which is incremented by 1.0. The accumulated vector is
/// L2-normalized; text with no tokens embeds to the all-zero vector.
#[derive(Debug, Clone)]
pub struct HashBucketEmbedder {
    dimensions: usize,
}

impl HashBucketEmbedder {
    /// Create a new embedder producing vectors of the given dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `dimensions == 0`.
    pub fn new(dimensions: usize) -> Result<Self> {
        validate_dimensions(dimensions)?;
        Ok(Self { dimensions })
    }
}

impl Default for HashBucketEmbedder {
    fn default() -> Self {
        Self { dimensions: DEFAULT_DIMENSIONS }
    }
}

#[async_trait]
impl EmbeddingProvider for HashBucketEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut buckets = vec![0.0f32; self.dimensions];
        let mut seen_token = false;

        for token in text.to_lowercase().split_whitespace() {
            seen_token = true;
            let digest = Sha256::digest(token.as_bytes());
            let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
            let bucket = (prefix as usize) % self.dimensions;
            buckets[bucket] += 1.0;
        }

        if !seen_token {
            return Ok(buckets);
        }

        let norm = buckets.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > 0.0 {
            for component in &mut buckets {
                *component /= norm;
            }
        }

        Ok(buckets)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn strategy(&self) -> EmbeddingStrategy {
        EmbeddingStrategy::HashBucket
    }
}

/// Hash-seeded pseudo-random embedder.
///
/// A SHA-256 digest over the model tag and the input text derives a 64-bit
/// PRNG seed; the vector's components are uniform samples in `[-1.0, 1.0)`.
/// Output is deterministic but not unit-norm.
#[derive(Debug, Clone)]
pub struct HashSeededEmbedder {
    dimensions: usize,
    model_tag: String,
}

impl HashSeededEmbedder {
    /// Create a new embedder producing vectors of the given dimensionality.
    ///
    /// The `model_tag` participates in the seed so that two logical models
    /// embed the same text differently.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if `dimensions == 0`.
    pub fn new(dimensions: usize, model_tag: impl Into<String>) -> Result<Self> {
        validate_dimensions(dimensions)?;
        Ok(Self { dimensions, model_tag: model_tag.into() })
    }
}

#[async_trait]
impl EmbeddingProvider for HashSeededEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut hasher = Sha256::new();
        hasher.update(self.model_tag.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();

        let seed = u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        let mut rng = StdRng::seed_from_u64(seed);

        Ok((0..self.dimensions).map(|_| rng.random_range(-1.0f32..1.0f32)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn strategy(&self) -> EmbeddingStrategy {
        EmbeddingStrategy::HashSeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|c| c * c).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn rejects_zero_dimensions() {
        assert!(matches!(HashBucketEmbedder::new(0), Err(RagError::InvalidParameter { .. })));
        assert!(matches!(
            HashSeededEmbedder::new(0, "test"),
            Err(RagError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn providers_report_dimensions_and_strategy_tag() {
        let bucket = HashBucketEmbedder::new(64).unwrap();
        assert_eq!(bucket.dimensions(), 64);
        assert_eq!(bucket.strategy(), EmbeddingStrategy::HashBucket);
        assert_eq!(bucket.strategy().as_str(), "hash-bucket");

        let seeded = HashSeededEmbedder::new(96, "minilm-l6-v2").unwrap();
        assert_eq!(seeded.dimensions(), 96);
        assert_eq!(seeded.strategy(), EmbeddingStrategy::HashSeeded);
        assert_eq!(seeded.strategy().as_str(), "hash-seeded");
    }

    #[tokio::test]
    async fn hash_bucket_is_deterministic() {
        let embedder = HashBucketEmbedder::new(64).unwrap();
        let a = embedder.embed("pembrolizumab nsclc pd-l1").await.unwrap();
        let b = embedder.embed("pembrolizumab nsclc pd-l1").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn hash_bucket_is_unit_norm_for_nonempty_text() {
        let embedder = HashBucketEmbedder::new(128).unwrap();
        let v = embedder.embed("adjuvant chemotherapy for stage III colon cancer").await.unwrap();
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hash_bucket_embeds_whitespace_to_zero_vector() {
        let embedder = HashBucketEmbedder::new(32).unwrap();
        for text in ["", "   \n\t "] {
            let v = embedder.embed(text).await.unwrap();
            assert_eq!(v, vec![0.0; 32]);
        }
    }

    #[tokio::test]
    async fn hash_bucket_is_case_insensitive() {
        let embedder = HashBucketEmbedder::new(64).unwrap();
        let lower = embedder.embed("nsclc").await.unwrap();
        let upper = embedder.embed("NSCLC").await.unwrap();
        assert_eq!(lower, upper);
    }

    #[tokio::test]
    async fn hash_seeded_is_deterministic() {
        let embedder = HashSeededEmbedder::new(96, "minilm-l6-v2").unwrap();
        let a = embedder.embed("tumor microenvironment").await.unwrap();
        let b = embedder.embed("tumor microenvironment").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 96);
        assert!(a.iter().all(|c| (-1.0..1.0).contains(c)));
    }

    #[tokio::test]
    async fn hash_seeded_model_tag_changes_output() {
        let a = HashSeededEmbedder::new(32, "model-a").unwrap();
        let b = HashSeededEmbedder::new(32, "model-b").unwrap();
        assert_ne!(a.embed("metastasis").await.unwrap(), b.embed("metastasis").await.unwrap());
    }

    #[tokio::test]
    async fn strategies_diverge_on_identical_input() {
        let bucket = HashBucketEmbedder::new(48).unwrap();
        let seeded = HashSeededEmbedder::new(48, "minilm-l6-v2").unwrap();
        assert_ne!(
            bucket.embed("carcinoma").await.unwrap(),
            seeded.embed("carcinoma").await.unwrap()
        );
    }

    #[tokio::test]
    async fn embed_batch_matches_sequential_embed() {
        let embedder = HashBucketEmbedder::new(64).unwrap();
        let batch = embedder.embed_batch(&["first chunk", "second chunk"]).await.unwrap();
        assert_eq!(batch[0], embedder.embed("first chunk").await.unwrap());
        assert_eq!(batch[1], embedder.embed("second chunk").await.unwrap());
    }
}
