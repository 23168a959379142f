//! Data types for the extraction pipeline.

pub mod config;
pub mod document;
pub mod period;
pub mod record;
pub mod schema;
