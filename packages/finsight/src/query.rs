//! Query resolution - map a natural-language question onto the metric
//! schema and answer it from the canonical record.
//!
//! Resolution never calls the oracle: every answer is derived from the
//! stored record, and derived answers are cached per (fingerprint,
//! normalized query).

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::traits::store::RecordStore;
use crate::types::period::ReportPeriod;
use crate::types::record::CanonicalRecord;
use crate::types::schema::Metric;

fn filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:what\s+is|what's|whats|what\s+was|show\s+me|tell\s+me|give\s+me|how\s+much\s+is)\s+")
            .expect("valid regex")
    })
}

fn period_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+(?:for|in)?\s*Q\s*[1-4]\s*(?:FY\s*)?\d{2,4}\s*$").expect("valid regex")
    })
}

/// What a question is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// A metric straight from the schema
    Metric(Metric),

    /// Net profit as a percentage of revenue, derived from two metrics
    NetMargin,
}

/// A parsed question: the target plus an optional period reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedQuery {
    pub target: QueryTarget,
    pub period: Option<ReportPeriod>,
}

/// Parse a question like "What is the EBITDA for Q3FY25?" onto the
/// schema.
///
/// Fails with `InvalidQuery` when no schema metric (or derivable
/// quantity) matches, rather than guessing.
pub fn parse_query(question: &str) -> Result<ParsedQuery> {
    let trimmed = question.trim().trim_end_matches(['?', '.', '!']).trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::InvalidQuery {
            reason: "empty question".into(),
        });
    }

    let period = ReportPeriod::parse(trimmed);
    let without_period = period_clause_re().replace(trimmed, "");
    let without_filler = filler_re().replace(&without_period, "");
    let term = without_filler
        .trim()
        .trim_start_matches("the ")
        .trim_start_matches("The ")
        .trim();

    let target = match term.to_lowercase().as_str() {
        "net margin" | "net profit margin" | "profit margin" => QueryTarget::NetMargin,
        _ => match Metric::from_label(term) {
            Some(metric) => QueryTarget::Metric(metric),
            None => {
                return Err(ExtractionError::InvalidQuery {
                    reason: format!("'{term}' does not match a known financial metric"),
                })
            }
        },
    };

    Ok(ParsedQuery { target, period })
}

/// Derive an answer for a question from a canonical record.
///
/// Pure: no store access, no oracle. An absent metric yields a "not
/// reported" answer, never a zero.
pub fn derive_answer(record: &CanonicalRecord, question: &str) -> Result<String> {
    let parsed = parse_query(question)?;

    let mut answer = match parsed.target {
        QueryTarget::Metric(metric) => metric_answer(record, metric),
        QueryTarget::NetMargin => net_margin_answer(record),
    };

    // The record covers one period; flag a question scoped to another.
    if let (Some(asked), Some(extracted)) = (parsed.period, record.period) {
        if asked != extracted {
            answer.push_str(&format!(
                " Note: this document was extracted for {}, not {}.",
                extracted.label(),
                asked.label()
            ));
        }
    }

    Ok(answer)
}

fn metric_answer(record: &CanonicalRecord, metric: Metric) -> String {
    match record.get(metric) {
        Some(resolved) => format!(
            "{}: {} (from chunk {})",
            metric.label(),
            resolved.value.raw,
            resolved.provenance.chunk_index
        ),
        None => format!("{} is not reported in this document.", metric.label()),
    }
}

fn net_margin_answer(record: &CanonicalRecord) -> String {
    let net_profit = record.get(Metric::NetProfit).and_then(|v| v.value.amount);
    let revenue = record.get(Metric::Revenue).and_then(|v| v.value.amount);

    match (net_profit, revenue) {
        (Some(profit), Some(revenue)) if revenue != 0.0 => {
            format!("Net Margin: {:.2}%", profit / revenue * 100.0)
        }
        (Some(_), Some(_)) => {
            "Net Margin cannot be derived: revenue is zero.".to_string()
        }
        _ => "Net Margin cannot be derived: net profit or revenue is not reported in this document."
            .to_string(),
    }
}

/// Answer a question against an extracted document, consulting the
/// answer cache first.
///
/// The flow is cache → record → derive → cache the derivation. Fails
/// with `RecordNotFound` when the document has never been extracted;
/// resolution never triggers extraction.
pub async fn resolve_answer<S: RecordStore + ?Sized>(
    store: &S,
    fingerprint: &str,
    question: &str,
) -> Result<String> {
    if let Some(answer) = store.get_answer(fingerprint, question).await? {
        debug!(fingerprint, "answer cache hit");
        return Ok(answer);
    }

    let record = store
        .get_record(fingerprint)
        .await?
        .ok_or_else(|| ExtractionError::RecordNotFound {
            fingerprint: fingerprint.to_string(),
        })?;

    let answer = derive_answer(&record, question)?;

    // A failed answer-cache write only costs the next caller a
    // re-derivation; the answer itself is still good.
    if let Err(e) = store.put_answer(fingerprint, question, &answer).await {
        warn!(fingerprint, error = %e, "failed to cache answer");
    }

    Ok(answer)
}
