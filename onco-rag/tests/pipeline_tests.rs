//! Integration tests for the ingestion pipeline and search orchestrator
//! against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use onco_rag::extract::FailingExtractor;
use onco_rag::{
    CharWindowChunker, ChunkMatch, ChunkRecord, ChunkStore, DocumentInput, DocumentMeta,
    EmbeddingProvider, HashBucketEmbedder, IngestPipeline, IngestStatus, InMemoryStore, RagError,
    Retriever, SearchService,
};

const DIM: usize = 256;

fn input(title: &str, cancer_type: Option<&str>, text: &str) -> DocumentInput {
    DocumentInput {
        title: title.to_string(),
        source: "test-corpus".to_string(),
        cancer_type: cancer_type.map(str::to_string),
        url: None,
        bytes: text.as_bytes().to_vec(),
    }
}

fn pipeline(store: Option<Arc<InMemoryStore>>) -> IngestPipeline {
    let mut builder = IngestPipeline::builder()
        .chunker(Arc::new(CharWindowChunker::new(200, 20).unwrap()))
        .embedder(Arc::new(HashBucketEmbedder::new(DIM).unwrap()));
    if let Some(store) = store {
        builder = builder.store(store);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn ingestion_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline(Some(store.clone()));
    let doc = input("guideline.txt", Some("NSCLC"), &"adjuvant therapy ".repeat(40));

    let first = pipeline.ingest_document(&doc).await.unwrap();
    assert_eq!(first.status, IngestStatus::Persisted);
    let n = first.chunk_count;
    assert!(n > 1, "test document should span multiple chunks");
    assert_eq!(store.chunk_count().await.unwrap(), n as u64);

    // Same bytes again: N rows, not 2N.
    let second = pipeline.ingest_document(&doc).await.unwrap();
    assert_eq!(second.status, IngestStatus::Persisted);
    assert_eq!(store.chunk_count().await.unwrap(), n as u64);
}

#[tokio::test]
async fn reingestion_updates_title_but_preserves_identity() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline(Some(store.clone()));
    let text = "Durvalumab consolidation after chemoradiotherapy.";

    pipeline.ingest_document(&input("v1.txt", None, text)).await.unwrap();
    pipeline.ingest_document(&input("v2.txt", None, text)).await.unwrap();

    let query_embedding = HashBucketEmbedder::new(DIM).unwrap().embed(text).await.unwrap();
    let matches = store.query_nearest(&query_embedding, 5).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].document.title, "v2.txt");
}

#[tokio::test]
async fn missing_store_skips_persistence_but_keeps_records() {
    let pipeline = pipeline(None);
    let doc = input("note.txt", None, "Pembrolizumab monotherapy outcomes.");

    let outcome = pipeline.ingest_document(&doc).await.unwrap();
    assert_eq!(outcome.status, IngestStatus::SkippedPersistence);
    let prepared = outcome.prepared.expect("records retained for retry");
    assert_eq!(prepared.records.len(), outcome.chunk_count);

    // Retry against a real store without recomputation.
    let store = Arc::new(InMemoryStore::new());
    let retry = pipeline_with_store(store.clone());
    let persisted = retry.persist(&prepared).await.unwrap();
    assert_eq!(persisted as u64, store.chunk_count().await.unwrap());
}

fn pipeline_with_store(store: Arc<InMemoryStore>) -> IngestPipeline {
    pipeline(Some(store))
}

#[tokio::test]
async fn extraction_failure_skips_document_and_continues() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = IngestPipeline::builder()
        .chunker(Arc::new(CharWindowChunker::new(200, 20).unwrap()))
        .embedder(Arc::new(HashBucketEmbedder::new(DIM).unwrap()))
        .extractor(Arc::new(FailingExtractor))
        .store(store.clone())
        .build()
        .unwrap();

    let report = pipeline
        .ingest_batch(&[input("bad.pdf", None, "x"), input("worse.pdf", None, "y")])
        .await
        .unwrap();
    assert_eq!(report.count(IngestStatus::Failed), 2);
    assert_eq!(report.chunks_persisted, 0);
    assert_eq!(store.chunk_count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_document_produces_no_chunks() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline(Some(store.clone()));

    let outcome = pipeline.ingest_document(&input("empty.txt", None, "   \n\t ")).await.unwrap();
    assert_eq!(outcome.status, IngestStatus::Persisted);
    assert_eq!(outcome.chunk_count, 0);
    assert_eq!(store.chunk_count().await.unwrap(), 0);
}

fn retriever(store: Arc<InMemoryStore>) -> Retriever {
    Retriever::new(
        Arc::new(HashBucketEmbedder::new(DIM).unwrap()),
        store,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn search_empty_store_returns_empty_list() {
    let results = retriever(Arc::new(InMemoryStore::new())).search("lung cancer", 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn search_rejects_empty_query_and_bad_top_k() {
    let retriever = retriever(Arc::new(InMemoryStore::new()));
    assert!(matches!(
        retriever.search("", 2).await,
        Err(RagError::InvalidParameter { field, .. }) if field == "query"
    ));
    assert!(matches!(
        retriever.search("lung cancer", 0).await,
        Err(RagError::InvalidParameter { field, .. }) if field == "top_k"
    ));
    assert!(matches!(
        retriever.search("lung cancer", 51).await,
        Err(RagError::InvalidParameter { field, .. }) if field == "top_k"
    ));
}

#[tokio::test]
async fn search_respects_top_k_bound() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline(Some(store.clone()));
    pipeline
        .ingest_batch(&[
            input("a.txt", None, "lung cancer screening with low-dose CT"),
            input("b.txt", None, "lung cancer staging and TNM classification"),
        ])
        .await
        .unwrap();

    let results = retriever(store).search("lung cancer", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].score >= results[1].score);
}

/// Store whose backend connection is down: every call fails fast.
struct UnreachableStore;

#[async_trait]
impl ChunkStore for UnreachableStore {
    async fn upsert_document(&self, _meta: &DocumentMeta) -> onco_rag::Result<i64> {
        Err(RagError::StoreUnavailable {
            backend: "pgvector".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn upsert_chunks(
        &self,
        _document_id: i64,
        _records: &[ChunkRecord],
    ) -> onco_rag::Result<()> {
        Err(RagError::StoreUnavailable {
            backend: "pgvector".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn query_nearest(
        &self,
        _embedding: &[f32],
        _top_k: usize,
    ) -> onco_rag::Result<Vec<ChunkMatch>> {
        Err(RagError::StoreUnavailable {
            backend: "pgvector".to_string(),
            message: "connection refused".to_string(),
        })
    }

    async fn chunk_count(&self) -> onco_rag::Result<u64> {
        Err(RagError::StoreUnavailable {
            backend: "pgvector".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// Store that answers correctly but only after a fixed delay.
struct SlowStore {
    delay: Duration,
}

#[async_trait]
impl ChunkStore for SlowStore {
    async fn upsert_document(&self, _meta: &DocumentMeta) -> onco_rag::Result<i64> {
        tokio::time::sleep(self.delay).await;
        Ok(1)
    }

    async fn upsert_chunks(
        &self,
        _document_id: i64,
        _records: &[ChunkRecord],
    ) -> onco_rag::Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn query_nearest(
        &self,
        _embedding: &[f32],
        _top_k: usize,
    ) -> onco_rag::Result<Vec<ChunkMatch>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn chunk_count(&self) -> onco_rag::Result<u64> {
        Ok(0)
    }
}

#[tokio::test]
async fn unreachable_store_skips_persistence_and_retains_records() {
    let pipeline = IngestPipeline::builder()
        .chunker(Arc::new(CharWindowChunker::new(200, 20).unwrap()))
        .embedder(Arc::new(HashBucketEmbedder::new(DIM).unwrap()))
        .store(Arc::new(UnreachableStore))
        .build()
        .unwrap();

    let outcome = pipeline
        .ingest_document(&input("note.txt", None, "Osimertinib for EGFR-mutated disease."))
        .await
        .unwrap();
    assert_eq!(outcome.status, IngestStatus::SkippedPersistence);
    let prepared = outcome.prepared.expect("records retained for retry");
    assert_eq!(prepared.records.len(), outcome.chunk_count);

    // The unreachable backend stored nothing; a healthy one accepts the retry.
    let store = Arc::new(InMemoryStore::new());
    let retry = pipeline_with_store(store.clone());
    let persisted = retry.persist(&prepared).await.unwrap();
    assert_eq!(persisted as u64, store.chunk_count().await.unwrap());
}

#[tokio::test]
async fn slow_store_write_times_out() {
    let pipeline = IngestPipeline::builder()
        .chunker(Arc::new(CharWindowChunker::new(200, 20).unwrap()))
        .embedder(Arc::new(HashBucketEmbedder::new(DIM).unwrap()))
        .store(Arc::new(SlowStore { delay: Duration::from_millis(500) }))
        .store_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let err = pipeline
        .ingest_document(&input("note.txt", None, "Nivolumab plus ipilimumab combination."))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Timeout { .. }));
}

#[tokio::test]
async fn slow_store_query_times_out() {
    let retriever = Retriever::new(
        Arc::new(HashBucketEmbedder::new(DIM).unwrap()),
        Arc::new(SlowStore { delay: Duration::from_millis(500) }),
        Duration::from_millis(20),
    );

    let err = retriever.search("lung cancer", 5).await.unwrap_err();
    assert!(matches!(err, RagError::Timeout { .. }));
}

#[tokio::test]
async fn end_to_end_pembrolizumab_scenario() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline(Some(store.clone()));

    let doc = input(
        "keynote.txt",
        Some("NSCLC"),
        "Pembrolizumab is effective for PD-L1 positive NSCLC patients.",
    );
    let outcome = pipeline.ingest_document(&doc).await.unwrap();
    assert_eq!(outcome.status, IngestStatus::Persisted);
    assert_eq!(outcome.chunk_count, 1);

    let results = retriever(store).search("lung cancer", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].text.contains("PD-L1"));
    assert_eq!(results[0].document.cancer_type.as_deref(), Some("NSCLC"));
}
