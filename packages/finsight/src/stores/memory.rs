//! In-memory store for tests and single-process use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::normalize::normalize_query;
use crate::traits::store::RecordStore;
use crate::types::record::CanonicalRecord;

/// In-memory [`RecordStore`]. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, CanonicalRecord>>,
    answers: RwLock<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Number of cached answers.
    pub fn answer_count(&self) -> usize {
        self.answers.read().unwrap().len()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
        self.answers.write().unwrap().clear();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, fingerprint: &str) -> Result<Option<CanonicalRecord>> {
        Ok(self.records.read().unwrap().get(fingerprint).cloned())
    }

    async fn put_record(&self, record: &CanonicalRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.fingerprint.clone(), record.clone());
        Ok(())
    }

    async fn get_answer(&self, fingerprint: &str, query: &str) -> Result<Option<String>> {
        let key = (fingerprint.to_string(), normalize_query(query));
        Ok(self.answers.read().unwrap().get(&key).cloned())
    }

    async fn put_answer(&self, fingerprint: &str, query: &str, answer: &str) -> Result<()> {
        let key = (fingerprint.to_string(), normalize_query(query));
        self.answers.write().unwrap().insert(key, answer.to_string());
        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> Result<()> {
        self.records.write().unwrap().remove(fingerprint);
        self.answers
            .write()
            .unwrap()
            .retain(|(fp, _), _| fp != fingerprint);
        Ok(())
    }
}
