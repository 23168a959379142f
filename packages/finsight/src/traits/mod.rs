//! Core trait abstractions: the model oracle and the cache store.

pub mod oracle;
pub mod store;
