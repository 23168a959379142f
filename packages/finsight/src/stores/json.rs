//! JSON-file store - one record file and one answer file per
//! fingerprint, written atomically.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/records/<fingerprint>.json   canonical record
//! <root>/answers/<fingerprint>.json   normalized query → answer map
//! ```
//!
//! Writes go to a temp file in the same directory and land via rename,
//! so a reader sees either the previous complete value or the new one.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{ExtractionError, Result};
use crate::normalize::normalize_query;
use crate::traits::store::RecordStore;
use crate::types::record::CanonicalRecord;

const WRITE_ATTEMPTS: u32 = 3;

/// File-backed [`RecordStore`] keeping one JSON file per fingerprint.
pub struct JsonFileStore {
    records_dir: PathBuf,
    answers_dir: PathBuf,

    // Serializes all writes; reads go lock-free against complete files.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let records_dir = root.join("records");
        let answers_dir = root.join("answers");
        std::fs::create_dir_all(&records_dir).map_err(storage_err)?;
        std::fs::create_dir_all(&answers_dir).map_err(storage_err)?;
        Ok(Self {
            records_dir,
            answers_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, fingerprint: &str) -> Result<PathBuf> {
        Ok(self.records_dir.join(format!("{}.json", checked(fingerprint)?)))
    }

    fn answer_path(&self, fingerprint: &str) -> Result<PathBuf> {
        Ok(self.answers_dir.join(format!("{}.json", checked(fingerprint)?)))
    }

    async fn read_answers(&self, fingerprint: &str) -> Result<BTreeMap<String, String>> {
        Ok(read_json(&self.answer_path(fingerprint)?)
            .await?
            .unwrap_or_default())
    }
}

/// Fingerprints are hex digests; anything else never names a file.
fn checked(fingerprint: &str) -> Result<&str> {
    if fingerprint.is_empty() || !fingerprint.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ExtractionError::InvalidInput {
            reason: format!("invalid fingerprint: {fingerprint:?}"),
        });
    }
    Ok(fingerprint)
}

fn storage_err(e: std::io::Error) -> ExtractionError {
    ExtractionError::Storage(Box::new(e))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_err(e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write via temp file + rename, retrying brief I/O hiccups.
async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    let mut backoff = Duration::from_millis(50);
    let mut last = String::new();
    for attempt in 1..=WRITE_ATTEMPTS {
        match try_write(&tmp, path, &bytes).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(path = %path.display(), attempt, error = %e, "store write failed");
                last = e.to_string();
                if attempt < WRITE_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
    Err(ExtractionError::CacheUnavailable(last))
}

async fn try_write(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, path).await
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(storage_err(e)),
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get_record(&self, fingerprint: &str) -> Result<Option<CanonicalRecord>> {
        read_json(&self.record_path(fingerprint)?).await
    }

    async fn put_record(&self, record: &CanonicalRecord) -> Result<()> {
        let path = self.record_path(&record.fingerprint)?;
        let _guard = self.write_lock.lock().await;
        write_json_atomic(&path, record).await
    }

    async fn get_answer(&self, fingerprint: &str, query: &str) -> Result<Option<String>> {
        let answers = self.read_answers(fingerprint).await?;
        Ok(answers.get(&normalize_query(query)).cloned())
    }

    async fn put_answer(&self, fingerprint: &str, query: &str, answer: &str) -> Result<()> {
        let path = self.answer_path(fingerprint)?;

        // The lock spans the read-modify-write so concurrent answer
        // writes for one fingerprint never lose entries.
        let _guard = self.write_lock.lock().await;
        let mut answers: BTreeMap<String, String> =
            read_json(&path).await?.unwrap_or_default();
        answers.insert(normalize_query(query), answer.to_string());
        write_json_atomic(&path, &answers).await
    }

    async fn remove(&self, fingerprint: &str) -> Result<()> {
        let record_path = self.record_path(fingerprint)?;
        let answer_path = self.answer_path(fingerprint)?;
        let _guard = self.write_lock.lock().await;
        remove_if_present(&record_path).await?;
        remove_if_present(&answer_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{MetricValue, Provenance, ResolvedValue};
    use crate::types::schema::Metric;
    use chrono::Utc;
    use indexmap::IndexMap;

    fn record(fingerprint: &str) -> CanonicalRecord {
        CanonicalRecord {
            fingerprint: fingerprint.into(),
            period: None,
            values: IndexMap::from([(
                Metric::Revenue,
                ResolvedValue {
                    value: MetricValue::parse("Rs. 120 cr").unwrap(),
                    provenance: Provenance {
                        chunk_index: 2,
                        confidence: None,
                    },
                },
            )]),
            failed_chunks: Vec::new(),
            chunk_count: 3,
            prompt_hash: "hash".into(),
            extracted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.put_record(&record("abc123")).await.unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        let loaded = store.get_record("abc123").await.unwrap().unwrap();
        assert_eq!(loaded.get(Metric::Revenue).unwrap().value.raw, "Rs. 120 cr");
        assert_eq!(loaded.get(Metric::Revenue).unwrap().provenance.chunk_index, 2);
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get_record("deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.put_record(&record("abc123")).await.unwrap();
        let mut updated = record("abc123");
        updated.chunk_count = 9;
        store.put_record(&updated).await.unwrap();

        assert_eq!(store.get_record("abc123").await.unwrap().unwrap().chunk_count, 9);
    }

    #[tokio::test]
    async fn test_answers_accumulate_and_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.put_answer("abc123", "What is the EBITDA?", "a1").await.unwrap();
        store.put_answer("abc123", "What is the EPS?", "a2").await.unwrap();

        assert_eq!(
            store.get_answer("abc123", "what IS the  ebitda?").await.unwrap(),
            Some("a1".to_string())
        );
        assert_eq!(
            store.get_answer("abc123", "What is the EPS?").await.unwrap(),
            Some("a2".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_answer_writes_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::open(dir.path()).unwrap());

        // The write lock spans each read-modify-write, so racing
        // writers never clobber each other's entries.
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .put_answer("abc123", &format!("question {i}"), &format!("answer {i}"))
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        for i in 0..4 {
            assert_eq!(
                store.get_answer("abc123", &format!("question {i}")).await.unwrap(),
                Some(format!("answer {i}"))
            );
        }
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.put_record(&record("abc123")).await.unwrap();
        store.put_answer("abc123", "q", "a").await.unwrap();

        store.remove("abc123").await.unwrap();
        store.remove("abc123").await.unwrap();
        assert!(store.get_record("abc123").await.unwrap().is_none());
        assert!(store.get_answer("abc123", "q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get_record("../escape").await,
            Err(ExtractionError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        std::fs::write(dir.path().join("records/abc123.json"), b"{ not json").unwrap();
        assert!(matches!(
            store.get_record("abc123").await,
            Err(ExtractionError::JsonParse(_))
        ));
    }
}
