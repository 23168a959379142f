//! End-to-end pipeline tests against the mock oracle.

use std::time::Duration;

use finsight::testing::{pages, MockOracle};
use finsight::{
    Document, ExtractionError, ExtractorConfig, JsonFileStore, MemoryStore, Metric, Pipeline,
    PipelineConfig,
};
use tokio_util::sync::CancellationToken;

fn twelve_pages() -> Vec<String> {
    // Chunks at size 5: [0-4], [5-9], [10-11]. Pages 0 and 10 carry
    // markers the mock oracle keys its responses on.
    (0..12)
        .map(|i| match i {
            0 => "alpha. Revenue for the quarter was Rs. 100 cr.".to_string(),
            10 => "gamma. Revised revenue stood at Rs. 120 cr.".to_string(),
            _ => format!("page {i} narrative text"),
        })
        .collect()
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_chunk_size(5)
        .with_extractor(ExtractorConfig::default().with_initial_backoff(Duration::from_millis(1)))
}

#[tokio::test]
async fn test_later_chunk_wins_across_document() {
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#)
        .with_response("gamma", r#"{"Revenue": "Rs. 120 cr"}"#);
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle.clone(), fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let record = pipeline.extract_document(&document).await.unwrap();

    assert_eq!(record.chunk_count, 3);
    assert!(record.failed_chunks.is_empty());

    let revenue = record.get(Metric::Revenue).unwrap();
    assert_eq!(revenue.value.raw, "Rs. 120 cr");
    assert_eq!(revenue.provenance.chunk_index, 2);

    // One oracle call per chunk
    assert_eq!(oracle.call_count(), 3);
}

#[tokio::test]
async fn test_cache_hit_skips_oracle() {
    let oracle = MockOracle::new().with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#);
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle.clone(), fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let first = pipeline.extract_document(&document).await.unwrap();
    let calls_after_first = oracle.call_count();

    let second = pipeline.extract_document(&document).await.unwrap();
    assert_eq!(oracle.call_count(), calls_after_first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_chunk_degrades_to_absent() {
    // Chunk 0 succeeds, chunk 2 exhausts its retries.
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#)
        .with_failure("gamma");
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle.clone(), fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let record = pipeline.extract_document(&document).await.unwrap();

    assert_eq!(record.failed_chunks, vec![2]);
    assert_eq!(record.get(Metric::Revenue).unwrap().value.raw, "Rs. 100 cr");
    assert!(!record.is_low_confidence());

    // 1 call each for chunks 0 and 1, 3 attempts for chunk 2
    assert_eq!(oracle.call_count(), 5);
}

#[tokio::test]
async fn test_all_chunks_failed_is_low_confidence_not_error() {
    let oracle = MockOracle::new().with_failure("page");
    let pipeline = Pipeline::with_config(
        MemoryStore::new(),
        oracle,
        fast_config().with_chunk_size(2),
    );

    let document = Document::from_pages(["page one", "page two", "page three"]).unwrap();
    let record = pipeline.extract_document(&document).await.unwrap();

    assert!(record.is_low_confidence());
    assert_eq!(record.failed_chunks, vec![0, 1]);
    assert!(record.values.is_empty());
}

#[tokio::test]
async fn test_answers_cached_per_normalized_query() {
    let oracle = MockOracle::new().with_response("alpha", r#"{"EBITDA": "Rs. 30 cr"}"#);
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle.clone(), fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    pipeline.extract_document(&document).await.unwrap();
    let calls_after_extract = oracle.call_count();

    let first = pipeline
        .answer(&document.fingerprint, "What is the EBITDA?")
        .await
        .unwrap();
    let second = pipeline
        .answer(&document.fingerprint, "  what IS the\tEBITDA?")
        .await
        .unwrap();

    assert_eq!(first, "EBITDA: Rs. 30 cr (from chunk 0)");
    assert_eq!(first, second);
    // Query resolution never touches the oracle, and formatting
    // variants share one cache entry.
    assert_eq!(oracle.call_count(), calls_after_extract);
    assert_eq!(pipeline.store().answer_count(), 1);
}

#[tokio::test]
async fn test_absent_is_not_zero() {
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "0", "EPS": "Not found"}"#);
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle, fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let record = pipeline.extract_document(&document).await.unwrap();

    // Explicit zero is a value
    assert_eq!(record.get(Metric::Revenue).unwrap().value.amount, Some(0.0));
    // "Not found" is absence
    assert!(record.get(Metric::Eps).is_none());

    let answer = pipeline
        .answer(&document.fingerprint, "What is the EPS?")
        .await
        .unwrap();
    assert_eq!(answer, "EPS is not reported in this document.");
}

#[tokio::test]
async fn test_query_before_extraction_is_record_not_found() {
    let pipeline = Pipeline::with_config(MemoryStore::new(), MockOracle::new(), fast_config());
    let document = Document::from_pages(twelve_pages()).unwrap();

    let err = pipeline
        .answer(&document.fingerprint, "What is the revenue?")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::RecordNotFound { .. }));
}

#[tokio::test]
async fn test_zero_chunk_size_is_invalid_input() {
    // Built via struct literal, bypassing the clamping builder
    let config = PipelineConfig {
        chunk_size: 0,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::with_config(MemoryStore::new(), MockOracle::new(), config);

    let document = Document::from_pages(["some report text"]).unwrap();
    let err = pipeline.extract_document(&document).await.unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_concurrent_extractions_share_one_flight() {
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#)
        .with_latency(Duration::from_millis(50));
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle.clone(), fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let (a, b) = tokio::join!(
        pipeline.extract_document(&document),
        pipeline.extract_document(&document)
    );

    assert_eq!(a.unwrap(), b.unwrap());
    // Both callers rode one extraction: one call per chunk, not two
    assert_eq!(oracle.call_count(), 3);
}

#[tokio::test]
async fn test_cancellation_detaches_one_caller_only() {
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#)
        .with_latency(Duration::from_millis(100));
    let pipeline = std::sync::Arc::new(Pipeline::with_config(
        MemoryStore::new(),
        oracle.clone(),
        fast_config(),
    ));

    let document = Document::from_pages(twelve_pages()).unwrap();
    let token = CancellationToken::new();

    let cancelled = {
        let pipeline = pipeline.clone();
        let document = document.clone();
        let token = token.clone();
        tokio::spawn(async move {
            pipeline
                .extract_document_with_cancel(&document, &token)
                .await
        })
    };
    let surviving = {
        let pipeline = pipeline.clone();
        let document = document.clone();
        tokio::spawn(async move { pipeline.extract_document(&document).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let cancelled = cancelled.await.unwrap();
    assert!(matches!(cancelled, Err(ExtractionError::Cancelled)));

    // The other caller still gets the full record
    let record = surviving.await.unwrap().unwrap();
    assert_eq!(record.get(Metric::Revenue).unwrap().value.raw, "Rs. 100 cr");
    assert_eq!(oracle.call_count(), 3);
}

#[tokio::test]
async fn test_json_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = MockOracle::new().with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#);
    let document = Document::from_pages(twelve_pages()).unwrap();

    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        let pipeline = Pipeline::with_config(store, oracle.clone(), fast_config());
        pipeline.extract_document(&document).await.unwrap();
        pipeline
            .answer(&document.fingerprint, "What is the revenue?")
            .await
            .unwrap();
    }
    let calls_after_first = oracle.call_count();

    // A fresh process over the same directory reuses the cached record
    // and answer.
    let store = JsonFileStore::open(dir.path()).unwrap();
    let pipeline = Pipeline::with_config(store, oracle.clone(), fast_config());
    let record = pipeline.extract_document(&document).await.unwrap();
    let answer = pipeline
        .answer(&document.fingerprint, "what is the revenue?")
        .await
        .unwrap();

    assert_eq!(record.get(Metric::Revenue).unwrap().value.raw, "Rs. 100 cr");
    assert_eq!(answer, "Revenue: Rs. 100 cr (from chunk 0)");
    assert_eq!(oracle.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_derived_net_margin() {
    let oracle = MockOracle::new()
        .with_response("alpha", r#"{"Revenue": "Rs. 200 cr", "Net Profit": "Rs. 50 cr"}"#);
    let pipeline = Pipeline::with_config(MemoryStore::new(), oracle, fast_config());

    let document = Document::from_pages(twelve_pages()).unwrap();
    let answer = pipeline
        .query_document(&document, "What is the net margin?")
        .await
        .unwrap();
    assert_eq!(answer, "Net Margin: 25.00%");
}

#[tokio::test]
async fn test_pages_helper_round_trip() {
    let built = pages(&["alpha", "beta"]);
    assert_eq!(built.len(), 2);
    assert_eq!(built[1].index, 1);
    assert_eq!(built[1].text, "beta");
}
