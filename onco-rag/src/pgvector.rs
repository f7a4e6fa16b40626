//! pgvector (PostgreSQL) chunk store backend.
//!
//! Provides [`PgVectorStore`], a [`ChunkStore`] using
//! [sqlx](https://docs.rs/sqlx) with the
//! [pgvector](https://github.com/pgvector/pgvector) PostgreSQL extension.
//!
//! # Schema
//!
//! ```sql
//! documents(id BIGSERIAL, title, source, cancer_type, url, sha256 UNIQUE)
//! chunks(id BIGSERIAL, document_id REFERENCES documents, chunk_ix, body,
//!        source, embedding vector(d), UNIQUE(document_id, chunk_ix))
//! embedding_meta(dimension, strategy)   -- single row
//! ```
//!
//! The `embedding_meta` row records the dimensionality and strategy the
//! store was created with; [`PgVectorStore::connect`] checks them against
//! the caller's [`EmbeddingProvider`] and fails fast on disagreement, so an
//! ingest/query mismatch surfaces at startup instead of silently degrading
//! result quality.
//!
//! # Example
//!
//! ```rust,ignore
//! use onco_rag::pgvector::PgVectorStore;
//!
//! let store = PgVectorStore::connect(&database_url, &*embedder, store_timeout).await?;
//! let document_id = store.upsert_document(&meta).await?;
//! store.upsert_chunks(document_id, &records).await?;
//! let matches = store.query_nearest(&query_embedding, 5).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::document::{ChunkMatch, ChunkRecord, DocumentMeta, DocumentRef};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::store::ChunkStore;

const BACKEND: &str = "pgvector";

/// A [`ChunkStore`] backed by PostgreSQL with the pgvector extension.
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Connect to the database, ensure the schema exists, and validate the
    /// stored embedding metadata against the embedder that will produce the
    /// vectors.
    ///
    /// # Errors
    ///
    /// - [`RagError::StoreUnavailable`] if the database cannot be reached.
    /// - [`RagError::Config`] if the store was created with a different
    ///   embedding dimensionality or strategy.
    pub async fn connect(
        database_url: &str,
        embedder: &dyn EmbeddingProvider,
        store_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(store_timeout.min(Duration::from_secs(10)))
            .connect(database_url)
            .await
            .map_err(map_err)?;

        let store = Self::from_pool(pool);
        store.ensure_schema(embedder).await?;
        Ok(store)
    }

    /// Create a store from an existing connection pool without touching the
    /// schema. The caller is responsible for having run
    /// [`ensure_schema`](Self::ensure_schema).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the underlying connection pool. Called on process shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the extension and tables if absent, then check the embedding
    /// metadata row against the embedder's dimensionality and strategy tag.
    pub async fn ensure_schema(&self, embedder: &dyn EmbeddingProvider) -> Result<()> {
        let dimensions = embedder.dimensions();
        let strategy = embedder.strategy();

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (\
                id BIGSERIAL PRIMARY KEY, \
                title TEXT NOT NULL, \
                source TEXT NOT NULL, \
                cancer_type TEXT, \
                url TEXT, \
                sha256 TEXT NOT NULL UNIQUE\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        let create_chunks = format!(
            "CREATE TABLE IF NOT EXISTS chunks (\
                id BIGSERIAL PRIMARY KEY, \
                document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE, \
                chunk_ix INTEGER NOT NULL, \
                body TEXT NOT NULL, \
                source TEXT, \
                embedding vector({}), \
                UNIQUE (document_id, chunk_ix)\
            )",
            dimensions
        );
        sqlx::query(&create_chunks).execute(&self.pool).await.map_err(map_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embedding_meta (\
                id INTEGER PRIMARY KEY CHECK (id = 1), \
                dimension INTEGER NOT NULL, \
                strategy TEXT NOT NULL\
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        sqlx::query(
            "INSERT INTO embedding_meta (id, dimension, strategy) VALUES (1, $1, $2) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(dimensions as i32)
        .bind(strategy.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        let row = sqlx::query("SELECT dimension, strategy FROM embedding_meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let stored_dimension: i32 = row.get("dimension");
        let stored_strategy: String = row.get("strategy");

        if stored_dimension as usize != dimensions || stored_strategy != strategy.as_str() {
            return Err(RagError::Config(format!(
                "store was created with dimension={stored_dimension} strategy={stored_strategy}, \
                 but this process embeds with dimension={dimensions} strategy={strategy}"
            )));
        }

        info!(dimension = dimensions, strategy = %strategy, "pgvector schema ready");
        Ok(())
    }
}

fn map_err(e: sqlx::Error) -> RagError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => {
            RagError::StoreUnavailable { backend: BACKEND.to_string(), message: e.to_string() }
        }
        other => RagError::Store { backend: BACKEND.to_string(), message: other.to_string() },
    }
}

/// Format a vector as a pgvector text literal, e.g. `[0.1,0.2,0.3]`.
fn vector_literal(embedding: &[f32]) -> String {
    format!("[{}]", embedding.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
}

#[async_trait]
impl ChunkStore for PgVectorStore {
    async fn upsert_document(&self, meta: &DocumentMeta) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO documents (title, source, cancer_type, url, sha256) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (sha256) DO UPDATE SET title = EXCLUDED.title \
             RETURNING id",
        )
        .bind(&meta.title)
        .bind(&meta.source)
        .bind(&meta.cancer_type)
        .bind(&meta.url)
        .bind(&meta.sha256)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        let id: i64 = row.get("id");
        debug!(document_id = id, sha256 = %meta.sha256, "upserted document");
        Ok(id)
    }

    async fn upsert_chunks(&self, document_id: i64, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // One transaction per document so a cancelled ingestion rolls back
        // rather than leaving a partial chunk set.
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        for record in records {
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_ix, body, source, embedding) \
                 VALUES ($1, $2, $3, $4, $5::vector) \
                 ON CONFLICT (document_id, chunk_ix) DO UPDATE SET \
                    body = EXCLUDED.body, \
                    source = EXCLUDED.source, \
                    embedding = EXCLUDED.embedding",
            )
            .bind(document_id)
            .bind(record.chunk_ix)
            .bind(&record.text)
            .bind(&record.source)
            .bind(vector_literal(&record.embedding))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let mapped = map_err(e);
                RagError::Store {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "chunk upsert failed at (document_id={document_id}, chunk_ix={}): {mapped}",
                        record.chunk_ix
                    ),
                }
            })?;
        }

        tx.commit().await.map_err(map_err)?;
        debug!(document_id, count = records.len(), "upserted chunks");
        Ok(())
    }

    async fn query_nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ChunkMatch>> {
        // pgvector cosine distance operator: <=>. Distance 0 means identical,
        // so score = 1 - distance.
        let rows = sqlx::query(
            "SELECT c.id AS chunk_id, c.body, \
                    1 - (c.embedding <=> $1::vector) AS score, \
                    d.id AS document_id, d.title, d.source, d.cancer_type \
             FROM chunks c \
             JOIN documents d ON d.id = c.document_id \
             ORDER BY c.embedding <=> $1::vector \
             LIMIT $2",
        )
        .bind(vector_literal(embedding))
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let matches = rows
            .iter()
            .map(|row| {
                let score: f64 = row.get("score");
                ChunkMatch {
                    chunk_id: row.get("chunk_id"),
                    text: row.get("body"),
                    score: score as f32,
                    document: DocumentRef {
                        id: row.get("document_id"),
                        title: row.get("title"),
                        source: row.get("source"),
                        cancer_type: row.get("cancer_type"),
                    },
                }
            })
            .collect();

        Ok(matches)
    }

    async fn chunk_count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }
}
