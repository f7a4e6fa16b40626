//! `onco`: ingest oncology documents into the vector store and launch the
//! search API.

mod ingest;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use onco_rag::{HashBucketEmbedder, PgVectorStore, PipelineConfig, Retriever, database_url};
use onco_server::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onco", about = "Oncology document search: ingestion and API server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed, and upsert documents into the pgvector store.
    Ingest(ingest::IngestArgs),

    /// Run the HTTP search API.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind.
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Embedding dimensionality; must match the store.
        #[arg(long, default_value_t = onco_rag::DEFAULT_DIMENSIONS)]
        dimensions: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Ingest(args) => ingest::run(args).await,
        Command::Serve { host, port, dimensions } => serve(&host, port, dimensions).await,
    }
}

async fn serve(host: &str, port: u16, dimensions: usize) -> anyhow::Result<()> {
    // Missing DATABASE_URL fails here, before anything binds.
    let url = database_url()?;
    let config = PipelineConfig::builder().dimensions(dimensions).build()?;

    let embedder = Arc::new(HashBucketEmbedder::new(config.dimensions)?);
    let store = Arc::new(
        PgVectorStore::connect(&url, &*embedder, config.store_timeout)
            .await
            .context("connecting to pgvector store")?,
    );
    let retriever = Retriever::new(embedder, store.clone(), config.store_timeout);

    let state = AppState::new(Arc::new(retriever), config.default_top_k);
    let result = onco_server::serve(&format!("{host}:{port}"), state).await;

    store.close().await;
    result
}
