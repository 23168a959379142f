//! Cache store seam - canonical records and query answers by fingerprint.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::record::CanonicalRecord;

/// Durable mapping from document fingerprint to canonical record, plus a
/// secondary (fingerprint, normalized query) → answer mapping.
///
/// Contract:
/// - Entries are pure functions of their keys: values are replaced
///   wholesale, never mutated in place, and a reader always sees either
///   the old or the new complete value.
/// - Query text is normalized with
///   [`crate::normalize::normalize_query`] identically on read and
///   write, so cache hits are never missed to incidental formatting.
/// - `get_record` never triggers extraction.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the canonical record for a fingerprint, if extracted before.
    async fn get_record(&self, fingerprint: &str) -> Result<Option<CanonicalRecord>>;

    /// Store or atomically overwrite the record for its fingerprint.
    async fn put_record(&self, record: &CanonicalRecord) -> Result<()>;

    /// Fetch a cached answer for a query.
    async fn get_answer(&self, fingerprint: &str, query: &str) -> Result<Option<String>>;

    /// Cache an answer for a query.
    async fn put_answer(&self, fingerprint: &str, query: &str, answer: &str) -> Result<()>;

    /// Drop a fingerprint's record and all of its answers.
    async fn remove(&self, fingerprint: &str) -> Result<()>;
}
