//! Text normalization for report text and user queries.
//!
//! Financial PDFs arrive with inconsistent currency markers, thousands
//! separators inside figures, and several spellings of quarter labels.
//! Cleaning happens once at ingestion so the fingerprint, the chunk text
//! sent to the oracle, and term matching all see the same text.

use regex::Regex;
use std::sync::OnceLock;

fn thousands_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d),(\d{3})").expect("valid regex"))
}

fn crore_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)crores?").expect("valid regex"))
}

fn lakh_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)lakhs?").expect("valid regex"))
}

fn quarter_fy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Q(\d)\s+FY").expect("valid regex"))
}

fn quarter_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)quarter\s+(\d)").expect("valid regex"))
}

/// Clean extracted financial text: currency formats, thousands
/// separators, crore/lakh spelling, and quarter labels.
pub fn clean_report_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    // Standardize currency markers
    let mut text = text.replace('₹', "Rs.").replace("Rs ", "Rs. ");

    // Strip thousands separators inside numbers ("1,23,456" → "123456");
    // repeated because each pass removes one separator per figure
    loop {
        let replaced = thousands_re().replace_all(&text, "${1}${2}").into_owned();
        if replaced == text {
            break;
        }
        text = replaced;
    }

    let text = crore_re().replace_all(&text, "cr");
    let text = lakh_re().replace_all(&text, "lakh");

    // Standardize quarter representation ("Q3 FY25" → "Q3FY25")
    let text = quarter_fy_re().replace_all(&text, "Q${1}FY");
    let text = quarter_word_re().replace_all(&text, "Q${1}");

    text.trim().to_string()
}

/// Normalize a user query for cache keying: case folding plus whitespace
/// collapsing, so incidental formatting never misses a cache hit.
///
/// Applied identically on read and write by every [`RecordStore`]
/// implementation.
///
/// [`RecordStore`]: crate::traits::store::RecordStore
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_markers() {
        assert_eq!(clean_report_text("₹100 cr"), "Rs.100 cr");
        assert_eq!(clean_report_text("Rs 100 cr"), "Rs. 100 cr");
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(clean_report_text("revenue of 1,234 cr"), "revenue of 1234 cr");
        assert_eq!(clean_report_text("total 1,234,567"), "total 1234567");
        // Indian-style grouping
        assert_eq!(clean_report_text("12,34,567"), "1234567");
    }

    #[test]
    fn test_crore_lakh_spelling() {
        assert_eq!(clean_report_text("Rs. 5 Crores profit"), "Rs. 5 cr profit");
        assert_eq!(clean_report_text("20 Lakhs"), "20 lakh");
    }

    #[test]
    fn test_quarter_labels() {
        assert_eq!(clean_report_text("results for Q3 FY25"), "results for Q3FY25");
        assert_eq!(clean_report_text("Quarter 3 results"), "Q3 results");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(clean_report_text("   "), "");
    }

    #[test]
    fn test_query_normalization() {
        assert_eq!(normalize_query("What is  the EBITDA?"), "what is the ebitda?");
        assert_eq!(
            normalize_query("  what IS the\tebitda?  "),
            "what is the ebitda?"
        );
    }
}
