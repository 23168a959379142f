//! Oracle implementations.

mod groq;

pub use groq::GroqOracle;
