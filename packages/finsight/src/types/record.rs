//! Record types - per-chunk partial records and the canonical record.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::types::period::ReportPeriod;
use crate::types::schema::Metric;

/// Markers the oracle uses for metrics it could not find. These leave
/// the metric unset rather than producing a value.
const ABSENT_MARKERS: [&str; 6] = ["not found", "n/a", "na", "none", "-", "–"];

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?\d+(?:\.\d+)?").expect("valid regex"))
}

/// A metric value as the oracle reported it, with a numeric coercion
/// when the text looks numeric.
///
/// The raw text keeps units ("Rs. 100 cr", "12.4%") for answers; the
/// coerced amount supports derived computations. An explicit zero keeps
/// `amount` as `Some(0.0)` — absence is modelled by the metric missing
/// from the record entirely, never by a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Value text as reported, post normalization
    pub raw: String,

    /// Coerced numeric amount, when the text is numeric-looking
    pub amount: Option<f64>,
}

impl MetricValue {
    /// Parse a reported value string. Returns `None` for absent markers
    /// ("Not found", "N/A", empty) so the metric stays unset.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || ABSENT_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
            return None;
        }
        Some(Self {
            raw: trimmed.to_string(),
            amount: coerce_amount(trimmed),
        })
    }

    /// Build a value from a bare number.
    pub fn number(amount: f64) -> Self {
        Self {
            raw: format_amount(amount),
            amount: Some(amount),
        }
    }
}

/// Extract the numeric part of a value like "Rs. 100.5 cr" or "-3.2%".
fn coerce_amount(text: &str) -> Option<f64> {
    let mut rest = text.trim();
    for prefix in ["rs.", "rs", "inr", "₹", "$", "usd"] {
        rest = strip_prefix_ci(rest, prefix).trim_start();
    }
    let cleaned = rest.replace(',', "");
    leading_number_re()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Strip an ASCII-case-insensitive prefix, slicing the original string
/// only at a verified char boundary.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> &'a str {
    if text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        &text[prefix.len()..]
    } else {
        text
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

/// One chunk's report of a single metric, with optional confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedValue {
    pub value: MetricValue,

    /// Oracle-declared confidence in [0, 1], when reported
    pub confidence: Option<f64>,
}

impl ReportedValue {
    /// A value with no declared confidence.
    pub fn plain(value: MetricValue) -> Self {
        Self {
            value,
            confidence: None,
        }
    }
}

/// Metrics one extraction call found in its chunk.
///
/// Produced by the extractor, consumed immediately by the consolidator,
/// never persisted. May omit metrics absent from the chunk and may
/// conflict with other chunks of the same document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    /// Which chunk produced this record
    pub chunk_index: usize,

    /// Metric values found in the chunk
    pub values: IndexMap<Metric, ReportedValue>,
}

impl PartialRecord {
    /// Create an empty partial record (all metrics unset).
    pub fn new(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            values: IndexMap::new(),
        }
    }

    /// Add a metric value (builder style, for tests and mocks).
    pub fn with_value(mut self, metric: Metric, value: ReportedValue) -> Self {
        self.values.insert(metric, value);
        self
    }

    /// Whether the chunk contributed nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a resolved value came from, for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Chunk that supplied the winning value
    pub chunk_index: usize,

    /// Confidence the winning chunk declared, if any
    pub confidence: Option<f64>,
}

/// A metric value after conflict resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub value: MetricValue,
    pub provenance: Provenance,
}

/// The single consolidated record for a document.
///
/// Immutable once written to the store; re-extraction only occurs when
/// the document fingerprint (or the prompt hash) changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Document fingerprint this record belongs to
    pub fingerprint: String,

    /// Fiscal period the extraction was scoped to, if any
    pub period: Option<ReportPeriod>,

    /// Resolved metric values; a metric missing here is absent, not zero
    pub values: IndexMap<Metric, ResolvedValue>,

    /// Chunks whose extraction exhausted retries
    pub failed_chunks: Vec<usize>,

    /// Total chunks the document was split into
    pub chunk_count: usize,

    /// Hash of the prompt template the record was extracted with
    pub prompt_hash: String,

    /// When extraction completed
    pub extracted_at: DateTime<Utc>,
}

impl CanonicalRecord {
    /// Look up a resolved metric.
    pub fn get(&self, metric: Metric) -> Option<&ResolvedValue> {
        self.values.get(&metric)
    }

    /// True when every chunk failed and the record carries no metrics;
    /// callers should treat such a record as low confidence rather than
    /// a hard failure.
    pub fn is_low_confidence(&self) -> bool {
        self.values.is_empty() && self.failed_chunks.len() == self.chunk_count
    }
}
