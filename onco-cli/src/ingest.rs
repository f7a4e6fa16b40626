//! The `onco ingest` subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use onco_rag::{
    CharWindowChunker, Chunker, DocumentInput, HashBucketEmbedder, IngestPipeline, IngestStatus,
    PgVectorStore, PipelineConfig, TokenWindowChunker,
};
use tracing::warn;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChunkerKind {
    /// Whitespace-normalized character windows.
    Char,
    /// Whitespace-token windows.
    Token,
}

#[derive(Args)]
pub struct IngestArgs {
    /// One or more document paths to ingest.
    #[arg(long, num_args = 1.., required = true)]
    pub files: Vec<PathBuf>,

    /// PostgreSQL connection string. Without it, chunks are computed but
    /// persistence is skipped.
    #[arg(long, env = "DATABASE_URL")]
    pub db_url: Option<String>,

    /// Chunk window size (characters or tokens).
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks.
    #[arg(long, default_value_t = 200)]
    pub overlap: usize,

    /// Embedding dimensionality; must match the store.
    #[arg(long, default_value_t = onco_rag::DEFAULT_DIMENSIONS)]
    pub dimensions: usize,

    /// Chunking strategy.
    #[arg(long, value_enum, default_value_t = ChunkerKind::Char)]
    pub chunker: ChunkerKind,

    /// Source label recorded on the ingested documents.
    #[arg(long, default_value = "local-file")]
    pub source: String,

    /// Cancer-type classification recorded on the ingested documents.
    #[arg(long)]
    pub cancer_type: Option<String>,
}

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let config = PipelineConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.overlap)
        .dimensions(args.dimensions)
        .build()?;

    let chunker: Arc<dyn Chunker> = match args.chunker {
        ChunkerKind::Char => Arc::new(CharWindowChunker::new(args.chunk_size, args.overlap)?),
        ChunkerKind::Token => Arc::new(TokenWindowChunker::new(args.chunk_size, args.overlap)?),
    };
    let embedder = Arc::new(HashBucketEmbedder::new(config.dimensions)?);

    let mut builder = IngestPipeline::builder()
        .chunker(chunker)
        .embedder(embedder.clone())
        .store_timeout(config.store_timeout);

    let have_store = args.db_url.is_some();
    if let Some(url) = &args.db_url {
        let store = PgVectorStore::connect(url, &*embedder, config.store_timeout)
            .await
            .context("connecting to pgvector store")?;
        builder = builder.store(Arc::new(store));
    }
    let pipeline = builder.build()?;

    let mut inputs = Vec::new();
    for path in &args.files {
        if !path.exists() {
            println!("Skipping missing file: {}", path.display());
            continue;
        }
        if path.is_dir() {
            println!("Skipping directory (files only): {}", path.display());
            continue;
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        inputs.push(DocumentInput {
            title: path.display().to_string(),
            source: args.source.clone(),
            cancer_type: args.cancer_type.clone(),
            url: None,
            bytes,
        });
    }

    if inputs.is_empty() {
        println!("No records generated from provided files.");
        return Ok(());
    }

    let report = pipeline.ingest_batch(&inputs).await?;

    for outcome in &report.outcomes {
        match outcome.status {
            IngestStatus::Failed => {
                warn!(title = %outcome.title, error = ?outcome.error, "document skipped");
                println!("Skipping {}: extraction failed.", outcome.title);
            }
            _ if outcome.chunk_count == 0 => {
                println!("No content extracted from {}; skipping.", outcome.title);
            }
            _ => println!("Prepared {} chunk(s) from {}.", outcome.chunk_count, outcome.title),
        }
    }

    if !have_store {
        println!("DATABASE_URL not provided; skipping database upsert.");
    } else if report.count(IngestStatus::SkippedPersistence) > 0 {
        println!(
            "Store unreachable; {} document(s) computed but not persisted. Re-run to retry.",
            report.count(IngestStatus::SkippedPersistence)
        );
    } else {
        println!("Upserted {} chunk(s) into pgvector store.", report.chunks_persisted);
    }

    Ok(())
}
