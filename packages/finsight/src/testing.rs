//! Test doubles - a scriptable oracle and small fixture helpers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::OracleError;
use crate::traits::oracle::Oracle;
use crate::types::document::Page;

/// Scriptable [`Oracle`] for tests.
///
/// Responses are keyed by a marker substring looked up in the prompt, so
/// a test can give different chunks different answers by planting
/// markers in the page text. Clones share the call counter, letting a
/// test keep a handle while the pipeline owns its own clone.
///
/// ```rust,ignore
/// let oracle = MockOracle::new()
///     .with_response("alpha", r#"{"Revenue": "Rs. 100 cr"}"#)
///     .with_failure("broken");
/// ```
#[derive(Clone)]
pub struct MockOracle {
    responses: Vec<(String, String)>,
    failures: Vec<String>,
    default_response: String,
    latency: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            failures: Vec::new(),
            default_response: "{}".to_string(),
            latency: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Respond with `response` to any prompt containing `marker`.
    pub fn with_response(mut self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.push((marker.into(), response.into()));
        self
    }

    /// Fail with a 503 on any prompt containing `marker`.
    pub fn with_failure(mut self, marker: impl Into<String>) -> Self {
        self.failures.push(marker.into());
        self
    }

    /// Response for prompts matching no marker (default `{}`).
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Delay every call, so concurrent callers genuinely overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total completion calls across all clones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failures.iter().any(|marker| prompt.contains(marker)) {
            return Err(OracleError::Api {
                status: 503,
                message: "scripted failure".into(),
            });
        }

        let response = self
            .responses
            .iter()
            .find(|(marker, _)| prompt.contains(marker))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone());
        Ok(response)
    }
}

/// Build pages from raw text snippets.
pub fn pages(texts: &[&str]) -> Vec<Page> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| Page::new(index, *text))
        .collect()
}
