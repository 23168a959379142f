//! Configuration types for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::period::ReportPeriod;

/// How to resolve a metric reported with different values by different
/// chunks when declared confidence does not decide.
///
/// The later-chunk preference is a domain heuristic (reports commonly
/// restate summary figures near the end), not a proven property; it is a
/// policy knob and its tie-break behavior is pinned by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Later chunks win ties
    #[default]
    PreferLaterChunk,

    /// Earlier chunks win ties
    PreferEarlierChunk,
}

/// Tunables for per-chunk oracle extraction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Attempts per chunk before the chunk is written off
    pub max_attempts: u32,

    /// Per-attempt oracle deadline
    pub timeout: Duration,

    /// Initial delay between attempts (doubles per retry)
    pub initial_backoff: Duration,

    /// Upper bound on the retry delay
    pub max_backoff: Duration,

    /// Upper bound on chunk text sent to the oracle, in chars
    pub max_chunk_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            max_chunk_chars: 24_000,
        }
    }
}

impl ExtractorConfig {
    /// Set the attempt budget per chunk.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial retry backoff.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the chunk size limit in chars.
    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }
}

/// Configuration for document-level extraction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pages per chunk
    pub chunk_size: usize,

    /// Concurrent oracle calls per document
    pub concurrency: usize,

    /// Conflict resolution between chunks
    pub conflict_policy: ConflictPolicy,

    /// Per-chunk extraction tunables
    pub extractor: ExtractorConfig,

    /// Fiscal period to scope extraction prompts to, if known
    pub period: Option<ReportPeriod>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            concurrency: 4,
            conflict_policy: ConflictPolicy::default(),
            extractor: ExtractorConfig::default(),
            period: None,
        }
    }
}

impl PipelineConfig {
    /// Set pages per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the oracle concurrency bound.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the extractor tunables.
    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    /// Scope extraction prompts to a fiscal period.
    pub fn with_period(mut self, period: ReportPeriod) -> Self {
        self.period = Some(period);
        self
    }
}
