//! Per-chunk extraction - prompt the oracle, parse and validate its
//! free-form response into a partial record.

use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{ExtractionError, OracleError, Result};
use crate::pipeline::prompts::{format_extract_prompt, EXTRACT_SYSTEM_PROMPT};
use crate::traits::oracle::Oracle;
use crate::types::config::ExtractorConfig;
use crate::types::document::Chunk;
use crate::types::period::ReportPeriod;
use crate::types::record::{MetricValue, PartialRecord, ReportedValue};
use crate::types::schema::Metric;

fn json_window_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
}

/// Parse the oracle's free-form text into a partial record.
///
/// Tries a direct JSON parse first, then the widest brace window -
/// models often wrap the object in prose or code fences. Keys are
/// validated against the metric schema; unknown keys are dropped, and
/// absent markers ("Not found", "N/A") leave the metric unset.
pub fn parse_oracle_response(
    chunk_index: usize,
    response: &str,
) -> std::result::Result<PartialRecord, OracleError> {
    let object = parse_json_object(response)?;

    let mut record = PartialRecord::new(chunk_index);
    for (key, value) in object {
        let Some(metric) = Metric::from_label(&key) else {
            debug!(chunk = chunk_index, key = %key, "dropping unrecognized metric label");
            continue;
        };
        if let Some(reported) = parse_reported_value(&value) {
            record.values.insert(metric, reported);
        }
    }
    record.values.sort_keys();
    Ok(record)
}

fn parse_json_object(
    response: &str,
) -> std::result::Result<serde_json::Map<String, serde_json::Value>, OracleError> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(response.trim()) {
        return Ok(map);
    }

    let window = json_window_re()
        .find(response)
        .ok_or_else(|| OracleError::MalformedResponse {
            reason: "no JSON object in response".into(),
        })?;

    match serde_json::from_str(window.as_str()) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        _ => Err(OracleError::MalformedResponse {
            reason: "JSON window did not parse as an object".into(),
        }),
    }
}

/// Interpret one metric value from the response. `None` means absent.
fn parse_reported_value(value: &serde_json::Value) -> Option<ReportedValue> {
    match value {
        serde_json::Value::String(s) => MetricValue::parse(s).map(ReportedValue::plain),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(|amount| ReportedValue::plain(MetricValue::number(amount))),
        serde_json::Value::Object(map) => {
            let confidence = map
                .get("confidence")
                .and_then(|c| c.as_f64())
                .map(|c| c.clamp(0.0, 1.0));
            let value = match map.get("value")? {
                serde_json::Value::String(s) => MetricValue::parse(s)?,
                serde_json::Value::Number(n) => MetricValue::number(n.as_f64()?),
                _ => return None,
            };
            Some(ReportedValue { value, confidence })
        }
        _ => None,
    }
}

/// Issues extraction calls for single chunks, with retries and timeouts.
pub struct Extractor<O> {
    oracle: Arc<O>,
    config: ExtractorConfig,
}

impl<O: Oracle> Extractor<O> {
    pub fn new(oracle: Arc<O>, config: ExtractorConfig) -> Self {
        Self { oracle, config }
    }

    /// Extract one chunk into a partial record.
    ///
    /// Transport failures, timeouts, and malformed responses are retried
    /// up to the attempt budget with exponential backoff; exhaustion is
    /// an `ExtractionFailed` for this chunk only, so the rest of the
    /// document can still contribute. No caching happens here: the cache
    /// is per document, chunk boundaries are an implementation detail.
    pub async fn extract_chunk(
        &self,
        chunk: &Chunk,
        metrics: &[Metric],
        period: Option<&ReportPeriod>,
    ) -> Result<PartialRecord> {
        let text = chunk.text();
        if text.trim().is_empty() {
            return Err(ExtractionError::InvalidInput {
                reason: format!("chunk {} has no text", chunk.index),
            });
        }
        if text.len() > self.config.max_chunk_chars {
            return Err(ExtractionError::ChunkTooLarge {
                chunk_index: chunk.index,
                size: text.len(),
                limit: self.config.max_chunk_chars,
            });
        }

        let prompt = format_extract_prompt(metrics, period, &text);
        let mut backoff = self.config.initial_backoff;

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(chunk.index, &prompt).await {
                Ok(record) => {
                    debug!(
                        chunk = chunk.index,
                        attempt,
                        metrics = record.values.len(),
                        "chunk extracted"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    warn!(chunk = chunk.index, attempt, error = %e, "oracle attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
                Err(e) => {
                    warn!(chunk = chunk.index, attempt, error = %e, "extraction exhausted for chunk");
                    return Err(ExtractionError::ExtractionFailed {
                        chunk_index: chunk.index,
                        attempts: attempt,
                    });
                }
            }
        }

        Err(ExtractionError::ExtractionFailed {
            chunk_index: chunk.index,
            attempts: self.config.max_attempts,
        })
    }

    async fn attempt(
        &self,
        chunk_index: usize,
        prompt: &str,
    ) -> std::result::Result<PartialRecord, OracleError> {
        let seconds = self.config.timeout.as_secs();
        let response = timeout(
            self.config.timeout,
            self.oracle.complete(EXTRACT_SYSTEM_PROMPT, prompt),
        )
        .await
        .map_err(|_| OracleError::Timeout { seconds })??;

        parse_oracle_response(chunk_index, &response)
    }
}
