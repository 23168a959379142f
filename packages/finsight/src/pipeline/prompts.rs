//! Prompt construction for the extraction oracle.

use sha2::{Digest, Sha256};

use crate::types::period::ReportPeriod;
use crate::types::schema::Metric;

/// System instructions for extraction requests.
pub const EXTRACT_SYSTEM_PROMPT: &str =
    "You are a financial data extraction tool. Extract ONLY the requested values.";

/// Build the per-chunk extraction prompt.
///
/// When a period is given the oracle is told to ignore figures labeled
/// for other quarters, YTD figures, and cumulative values.
pub fn format_extract_prompt(
    metrics: &[Metric],
    period: Option<&ReportPeriod>,
    chunk_text: &str,
) -> String {
    let terms = metrics
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    match period {
        Some(period) => {
            prompt.push_str(&format!(
                "Extract ONLY financial values explicitly labeled for {}.\n\n",
                period.label()
            ));
            prompt.push_str(&format!(
                "- Quarter: {}\n- Year: FY{:02}\n",
                period.quarter,
                period.year.short()
            ));
        }
        None => {
            prompt.push_str("Extract ONLY financial values explicitly stated in the text below.\n\n");
        }
    }
    prompt.push_str(&format!("- Terms: {terms}\n"));
    prompt.push_str("- DO NOT return values from other quarters, YTD figures, or cumulative values.\n");
    prompt.push_str("- If a term is not found, return \"Not found\".\n");
    prompt.push_str(
        "- Respond with a single JSON object mapping each term to its value. A value may \
         also be an object {\"value\": ..., \"confidence\": 0.0-1.0} when you can rate \
         your confidence.\n\n",
    );
    prompt.push_str(
        "Example response:\n{\n    \"Revenue\": \"Rs. 100 cr\",\n    \"Net Profit\": \
         {\"value\": \"Rs. 50 cr\", \"confidence\": 0.9}\n}\n\n",
    );
    prompt.push_str(&format!("Text context:\n{chunk_text}\n"));
    prompt
}

/// Hash of the prompt template.
///
/// Stored with every canonical record: a prompt change invalidates
/// previously extracted documents the same way a fingerprint change
/// does.
pub fn extract_prompt_hash() -> String {
    let template = format_extract_prompt(&Metric::ALL, None, "");
    let mut hasher = Sha256::new();
    hasher.update(template.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::period::ReportPeriod;

    #[test]
    fn test_prompt_carries_terms_and_text() {
        let prompt = format_extract_prompt(&Metric::ALL, None, "some report text");
        assert!(prompt.contains("Revenue"));
        assert!(prompt.contains("EBITDA"));
        assert!(prompt.contains("some report text"));
    }

    #[test]
    fn test_period_scoping() {
        let period = ReportPeriod::parse("Q3FY25").unwrap();
        let prompt = format_extract_prompt(&Metric::ALL, Some(&period), "text");
        assert!(prompt.contains("Q3FY25"));
        assert!(prompt.contains("Quarter: Q3"));
        assert!(prompt.contains("Year: FY25"));
    }

    #[test]
    fn test_prompt_hash_stable() {
        assert_eq!(extract_prompt_hash(), extract_prompt_hash());
        assert_eq!(extract_prompt_hash().len(), 64);
    }
}
