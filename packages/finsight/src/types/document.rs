//! Document types - pages, documents, and extraction chunks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ExtractionError, Result};
use crate::normalize::clean_report_text;

/// A single page of report text, immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based position in the document
    pub index: usize,

    /// Plain text content (already OCR'd/extracted upstream)
    pub text: String,
}

impl Page {
    /// Create a new page.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// A financial-report document: ordered pages plus a content fingerprint.
///
/// Documents are created once at ingestion and never mutated. The
/// fingerprint is the cache key; re-extraction only happens when it
/// changes.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable hash of the page text, used as the cache key
    pub fingerprint: String,

    /// Ordered page sequence
    pub pages: Vec<Page>,

    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,

    /// Where the text came from, if known (e.g. a filename)
    pub source: Option<String>,
}

impl Document {
    /// Build a document from raw per-page text.
    ///
    /// Each page goes through financial text normalization before the
    /// fingerprint is computed, so cosmetic differences in the source
    /// never produce a distinct cache key. Fails with `InvalidInput`
    /// when there are no pages or every page is blank.
    pub fn from_pages<I, S>(pages: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages: Vec<Page> = pages
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page::new(index, clean_report_text(text.as_ref())))
            .collect();

        if pages.is_empty() {
            return Err(ExtractionError::InvalidInput {
                reason: "document has no pages".into(),
            });
        }
        if pages.iter().all(|p| p.text.is_empty()) {
            return Err(ExtractionError::InvalidInput {
                reason: "document has no page text".into(),
            });
        }

        let fingerprint = fingerprint_pages(&pages);
        Ok(Self {
            fingerprint,
            pages,
            ingested_at: Utc::now(),
            source: None,
        })
    }

    /// Record where the document text came from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Stable content fingerprint: SHA-256 over the page texts.
///
/// A record separator keeps page boundaries in the hash, so moving text
/// across a page break changes the fingerprint.
pub fn fingerprint_pages(pages: &[Page]) -> String {
    let mut hasher = Sha256::new();
    for page in pages {
        hasher.update(page.text.as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// A contiguous group of pages sent as one extraction unit.
///
/// Owned solely by one extraction call; chunk boundaries are an
/// implementation detail the cache never exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the chunk sequence
    pub index: usize,

    /// Pages in this chunk, in document order
    pub pages: Vec<Page>,
}

impl Chunk {
    /// Concatenated page text sent to the oracle.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of pages in this chunk.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
