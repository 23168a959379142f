//! The extraction pipeline - prompting, per-chunk extraction,
//! consolidation, and the document-level runner.

pub mod consolidate;
pub mod extract;
pub mod prompts;
pub mod runner;

pub use consolidate::consolidate;
pub use extract::{parse_oracle_response, Extractor};
pub use prompts::{extract_prompt_hash, format_extract_prompt, EXTRACT_SYSTEM_PROMPT};
pub use runner::Pipeline;
