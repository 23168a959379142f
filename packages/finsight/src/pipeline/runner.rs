//! Document-level extraction - cache check, fan-out over chunks,
//! consolidation, and the canonical-record write.
//!
//! Concurrent extractions of the same document are deduplicated: the
//! first caller starts the work and later callers await the same shared
//! flight, so a document's chunks hit the oracle at most once per
//! extraction regardless of caller count.

use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::chunk_pages;
use crate::error::{ExtractionError, Result};
use crate::pipeline::consolidate::consolidate;
use crate::pipeline::extract::Extractor;
use crate::pipeline::prompts::extract_prompt_hash;
use crate::traits::oracle::Oracle;
use crate::traits::store::RecordStore;
use crate::types::config::PipelineConfig;
use crate::types::document::{Chunk, Document};
use crate::types::record::{CanonicalRecord, PartialRecord};
use crate::types::schema::Metric;

/// One in-flight document extraction, awaitable by any number of callers.
/// The error is carried as text so the result stays cloneable.
type SharedExtraction = Shared<BoxFuture<'static, std::result::Result<CanonicalRecord, String>>>;

/// The extraction pipeline: store + oracle + tunables.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Pipeline<S, O> {
    store: Arc<S>,
    oracle: Arc<O>,
    config: PipelineConfig,
    prompt_hash: String,
    semaphore: Arc<Semaphore>,
    inflight: Arc<Mutex<HashMap<String, SharedExtraction>>>,
}

impl<S, O> Pipeline<S, O>
where
    S: RecordStore + 'static,
    O: Oracle + 'static,
{
    /// Create a pipeline with default configuration.
    pub fn new(store: S, oracle: O) -> Self {
        Self::with_config(store, oracle, PipelineConfig::default())
    }

    /// Create a pipeline with explicit configuration.
    pub fn with_config(store: S, oracle: O, config: PipelineConfig) -> Self {
        Self {
            store: Arc::new(store),
            oracle: Arc::new(oracle),
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            prompt_hash: extract_prompt_hash(),
            config,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extract a document's canonical record, using the cache when the
    /// fingerprint is already known.
    pub async fn extract_document(&self, document: &Document) -> Result<CanonicalRecord> {
        self.extract_document_with_cancel(document, &CancellationToken::new())
            .await
    }

    /// Like [`extract_document`](Self::extract_document), but the caller
    /// can abandon the wait.
    ///
    /// Cancellation detaches this caller only: the underlying extraction
    /// keeps running for any other caller awaiting the same document,
    /// and its result is still written to the store.
    pub async fn extract_document_with_cancel(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<CanonicalRecord> {
        if document.pages.is_empty() {
            return Err(ExtractionError::InvalidInput {
                reason: "document has no pages".into(),
            });
        }
        // Checked here, not inside the flight: errors escaping the
        // shared future surface as CacheUnavailable, which would bury
        // an input error.
        if self.config.chunk_size == 0 {
            return Err(ExtractionError::InvalidInput {
                reason: "chunk size must be at least one page".into(),
            });
        }

        if let Some(record) = self.store.get_record(&document.fingerprint).await? {
            if record.prompt_hash == self.prompt_hash {
                info!(
                    fingerprint = %document.fingerprint,
                    "cache hit, no oracle calls"
                );
                return Ok(record);
            }
            info!(
                fingerprint = %document.fingerprint,
                "prompt template changed since last extraction, re-extracting"
            );
        }

        let flight = self.join_flight(document);
        tokio::select! {
            result = flight => result.map_err(ExtractionError::CacheUnavailable),
            _ = cancel.cancelled() => {
                debug!(
                    fingerprint = %document.fingerprint,
                    "caller cancelled; extraction continues for remaining callers"
                );
                Err(ExtractionError::Cancelled)
            }
        }
    }

    /// Answer a question against an already-extracted document.
    pub async fn answer(&self, fingerprint: &str, question: &str) -> Result<String> {
        crate::query::resolve_answer(self.store.as_ref(), fingerprint, question).await
    }

    /// Extract (or hit the cache) and answer in one call.
    pub async fn query_document(&self, document: &Document, question: &str) -> Result<String> {
        self.extract_document(document).await?;
        self.answer(&document.fingerprint, question).await
    }

    /// Join the in-flight extraction for this fingerprint, starting one
    /// if none is running. The flight is spawned so it survives every
    /// caller abandoning it.
    fn join_flight(&self, document: &Document) -> SharedExtraction {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(flight) = inflight.get(&document.fingerprint) {
            debug!(
                fingerprint = %document.fingerprint,
                "joining in-flight extraction"
            );
            return flight.clone();
        }

        let fingerprint = document.fingerprint.clone();
        let handle = tokio::spawn({
            let store = self.store.clone();
            let oracle = self.oracle.clone();
            let config = self.config.clone();
            let prompt_hash = self.prompt_hash.clone();
            let semaphore = self.semaphore.clone();
            let registry = self.inflight.clone();
            let document = document.clone();
            let fingerprint = fingerprint.clone();
            async move {
                let result =
                    run_extraction(store, oracle, config, prompt_hash, document, semaphore).await;
                registry.lock().unwrap().remove(&fingerprint);
                result.map_err(|e| e.to_string())
            }
        });

        let flight: SharedExtraction = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(format!("extraction task failed: {e}")),
            }
        }
        .boxed()
        .shared();

        inflight.insert(fingerprint, flight.clone());
        flight
    }
}

/// Run the full extraction for one document: chunk, fan out bounded
/// oracle calls, consolidate, persist.
///
/// A chunk that exhausts its retries degrades to an empty partial record
/// and lands in `failed_chunks`; only storage failure aborts the flight.
async fn run_extraction<S, O>(
    store: Arc<S>,
    oracle: Arc<O>,
    config: PipelineConfig,
    prompt_hash: String,
    document: Document,
    semaphore: Arc<Semaphore>,
) -> Result<CanonicalRecord>
where
    S: RecordStore,
    O: Oracle,
{
    let chunks: Vec<Chunk> = chunk_pages(&document.pages, config.chunk_size)?.collect();
    let chunk_count = chunks.len();
    info!(
        fingerprint = %document.fingerprint,
        pages = document.page_count(),
        chunks = chunk_count,
        "extracting document"
    );

    let extractor = Arc::new(Extractor::new(oracle, config.extractor.clone()));
    let period = config.period;

    let tasks = chunks.into_iter().map(|chunk| {
        let extractor = extractor.clone();
        let semaphore = semaphore.clone();
        async move {
            let _permit = semaphore.acquire().await.unwrap();
            let index = chunk.index;
            match extractor
                .extract_chunk(&chunk, &Metric::ALL, period.as_ref())
                .await
            {
                Ok(partial) => (index, partial, false),
                Err(e) => {
                    warn!(chunk = index, error = %e, "chunk failed, treating its metrics as absent");
                    (index, PartialRecord::new(index), true)
                }
            }
        }
    });

    let mut outcomes = future::join_all(tasks).await;
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut partials = Vec::with_capacity(chunk_count);
    let mut failed_chunks = Vec::new();
    for (index, partial, failed) in outcomes {
        if failed {
            failed_chunks.push(index);
        }
        partials.push(partial);
    }

    let values = consolidate(&partials, config.conflict_policy);
    let record = CanonicalRecord {
        fingerprint: document.fingerprint.clone(),
        period,
        values,
        failed_chunks,
        chunk_count,
        prompt_hash,
        extracted_at: chrono::Utc::now(),
    };

    if record.is_low_confidence() {
        warn!(
            fingerprint = %record.fingerprint,
            "every chunk failed; storing an empty low-confidence record"
        );
    } else {
        info!(
            fingerprint = %record.fingerprint,
            metrics = record.values.len(),
            failed_chunks = record.failed_chunks.len(),
            "extraction complete"
        );
    }

    put_record_with_backoff(store.as_ref(), &record).await?;
    Ok(record)
}

/// Persist the canonical record, retrying brief store hiccups.
async fn put_record_with_backoff<S: RecordStore + ?Sized>(
    store: &S,
    record: &CanonicalRecord,
) -> Result<()> {
    const ATTEMPTS: u32 = 3;
    let mut backoff = Duration::from_millis(50);
    let mut last = String::new();

    for attempt in 1..=ATTEMPTS {
        match store.put_record(record).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(attempt, error = %e, "canonical record write failed");
                last = e.to_string();
                if attempt < ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    Err(ExtractionError::CacheUnavailable(last))
}
