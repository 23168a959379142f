//! The fixed metric schema and the financial-term synonym table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of metrics extracted from every report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    NetProfit,
    Ebitda,
    Eps,
    Dividend,
    TotalAssets,
    TotalLiabilities,
    CashFlow,
    Roe,
}

impl Metric {
    /// Every metric in the schema, in canonical order.
    pub const ALL: [Metric; 9] = [
        Metric::Revenue,
        Metric::NetProfit,
        Metric::Ebitda,
        Metric::Eps,
        Metric::Dividend,
        Metric::TotalAssets,
        Metric::TotalLiabilities,
        Metric::CashFlow,
        Metric::Roe,
    ];

    /// Label used in prompts, persisted records, and answers.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::NetProfit => "Net Profit",
            Metric::Ebitda => "EBITDA",
            Metric::Eps => "EPS",
            Metric::Dividend => "Dividend",
            Metric::TotalAssets => "Total Assets",
            Metric::TotalLiabilities => "Total Liabilities",
            Metric::CashFlow => "Cash Flow",
            Metric::Roe => "ROE",
        }
    }

    /// Map a free-form financial term onto the schema.
    ///
    /// Covers the vocabulary reports (and oracle responses) actually use:
    /// "PAT", "turnover", "basic EPS", and so on. Returns `None` for terms
    /// outside the schema.
    pub fn from_label(label: &str) -> Option<Metric> {
        let key = label.trim().to_lowercase();
        match key.as_str() {
            "revenue" | "total revenue" | "net revenue" | "turnover" | "total income"
            | "sales" => Some(Metric::Revenue),
            "pat" | "profit after tax" | "net profit" | "net earnings" | "net income"
            | "profit" => Some(Metric::NetProfit),
            "ebitda"
            | "operating profit"
            | "earnings before interest, tax, depreciation"
            | "earnings before interest, tax, depreciation and amortisation" => {
                Some(Metric::Ebitda)
            }
            "eps" | "earnings per share" | "basic eps" | "diluted eps" => Some(Metric::Eps),
            "dividend" | "dividends declared" | "dividend payout" | "dividend per share" => {
                Some(Metric::Dividend)
            }
            "total assets" | "assets" => Some(Metric::TotalAssets),
            "total liabilities" | "liabilities" => Some(Metric::TotalLiabilities),
            "cash flow" | "net cash flow" | "operating cash flow"
            | "cash flow from operations" => Some(Metric::CashFlow),
            "roe" | "return on equity" => Some(Metric::Roe),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms_resolve() {
        assert_eq!(Metric::from_label("Turnover"), Some(Metric::Revenue));
        assert_eq!(Metric::from_label("PAT"), Some(Metric::NetProfit));
        assert_eq!(Metric::from_label("profit after tax"), Some(Metric::NetProfit));
        assert_eq!(Metric::from_label("  Basic EPS "), Some(Metric::Eps));
        assert_eq!(Metric::from_label("return on equity"), Some(Metric::Roe));
        assert_eq!(Metric::from_label("operating cash flow"), Some(Metric::CashFlow));
    }

    #[test]
    fn test_unknown_term() {
        assert_eq!(Metric::from_label("headcount"), None);
    }

    #[test]
    fn test_labels_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_label(metric.label()), Some(metric));
        }
    }
}
