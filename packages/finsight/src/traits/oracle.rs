//! Oracle seam - the external LLM service performing per-chunk extraction.

use async_trait::async_trait;

use crate::error::OracleError;

/// A chat-completion shaped model oracle.
///
/// Implementations wrap a concrete provider and return the model's raw
/// text. The oracle is an inherently nondeterministic, schema-less text
/// responder: the pipeline never trusts the response as structured data
/// and parses it behind a strict validation boundary instead.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// One completion request: system instructions plus user prompt.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OracleError>;
}
