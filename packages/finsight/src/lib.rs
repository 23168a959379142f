//! Financial-Report Metric Extraction Library
//!
//! A cache-first pipeline that turns financial-report text into a fixed
//! set of metrics using a language-model oracle, then answers questions
//! from the cached record without further model calls.
//!
//! # Design Philosophy
//!
//! **"Extract once, answer forever"**
//!
//! - Documents are fingerprinted by content; extraction runs at most
//!   once per fingerprint
//! - A fixed metric schema, not free-form Q&A against the model
//! - Absent is absent: a metric the report does not state is never
//!   reported as zero
//! - Every resolved value carries provenance back to the chunk that
//!   supplied it
//!
//! # Usage
//!
//! ```rust,ignore
//! use finsight::{Document, MemoryStore, Pipeline};
//! use finsight::oracle::GroqOracle;
//!
//! let store = MemoryStore::new();
//! let oracle = GroqOracle::from_env()?;
//! let pipeline = Pipeline::new(store, oracle);
//!
//! let document = Document::from_pages(page_texts)?;
//! let record = pipeline.extract_document(&document).await?;
//! let answer = pipeline.answer(&document.fingerprint, "What is the EBITDA?").await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (Oracle, RecordStore)
//! - [`types`] - Documents, records, periods, and configuration
//! - [`chunker`] - Fixed-size page chunking
//! - [`pipeline`] - Extraction, consolidation, and the runner
//! - [`query`] - Question parsing and answer derivation
//! - [`stores`] - Store implementations (MemoryStore, JsonFileStore)
//! - [`oracle`] - Oracle implementations (GroqOracle)
//! - [`normalize`] - Report-text and query normalization
//! - [`testing`] - Mock implementations for testing

pub mod chunker;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod query;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, OracleError, Result};
pub use traits::{oracle::Oracle, store::RecordStore};
pub use types::{
    config::{ConflictPolicy, ExtractorConfig, PipelineConfig},
    document::{fingerprint_pages, Chunk, Document, Page},
    period::{FiscalYear, Quarter, ReportPeriod},
    record::{
        CanonicalRecord, MetricValue, PartialRecord, Provenance, ReportedValue, ResolvedValue,
    },
    schema::Metric,
};

pub use chunker::{chunk_count, chunk_pages};
pub use normalize::{clean_report_text, normalize_query};

// Re-export pipeline components
pub use pipeline::{
    consolidate, extract_prompt_hash, format_extract_prompt, parse_oracle_response, Extractor,
    Pipeline,
};

pub use query::{derive_answer, parse_query, resolve_answer, ParsedQuery, QueryTarget};
pub use stores::{JsonFileStore, MemoryStore};
