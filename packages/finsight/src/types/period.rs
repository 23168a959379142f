//! Fiscal periods - quarter and fiscal-year parsing, labels, and dates.
//!
//! Uses the April-to-March fiscal calendar common to the reports this
//! pipeline targets: Q1 of FY25 is April-June 2024, Q4 is January-March
//! 2025.

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bQ\s*([1-4])\s*(?:FY\s*)?(\d{4}|\d{2})\b").expect("valid regex")
    })
}

/// A fiscal quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Parse quarter input in the forms users actually type: "Q3", "3",
    /// "3rd", "third".
    pub fn parse(input: &str) -> Option<Quarter> {
        match input.trim().to_uppercase().as_str() {
            "Q1" | "1" | "1ST" | "FIRST" => Some(Quarter::Q1),
            "Q2" | "2" | "2ND" | "SECOND" => Some(Quarter::Q2),
            "Q3" | "3" | "3RD" | "THIRD" => Some(Quarter::Q3),
            "Q4" | "4" | "4TH" | "FOURTH" => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// Quarter number, 1 through 4.
    pub fn number(&self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// A fiscal year in four-digit calendar form (FY25 is stored as 2025).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalYear(pub u16);

impl FiscalYear {
    /// Parse year input: "2025", "FY25", "25", or the words "current" /
    /// "previous" / "last".
    pub fn parse(input: &str) -> Option<FiscalYear> {
        let input = input.trim().to_uppercase();
        match input.as_str() {
            "CURRENT" => return Some(FiscalYear(Utc::now().year() as u16)),
            "PREVIOUS" | "LAST" => return Some(FiscalYear(Utc::now().year() as u16 - 1)),
            _ => {}
        }

        let digits = input.strip_prefix("FY").unwrap_or(&input).trim();
        let year: u16 = digits.parse().ok()?;
        match digits.len() {
            2 => Some(FiscalYear(2000 + year)),
            4 if (2000..=2100).contains(&year) => Some(FiscalYear(year)),
            _ => None,
        }
    }

    /// Two-digit form used in labels (2025 → 25).
    pub fn short(&self) -> u16 {
        self.0 % 100
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{:02}", self.short())
    }
}

/// A quarter within a fiscal year, e.g. Q3FY25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub quarter: Quarter,
    pub year: FiscalYear,
}

impl ReportPeriod {
    pub fn new(quarter: Quarter, year: FiscalYear) -> Self {
        Self { quarter, year }
    }

    /// Parse a period reference: "Q3FY25", "Q3 FY25", "Q3 2025".
    pub fn parse(input: &str) -> Option<Self> {
        let captures = period_re().captures(input)?;
        let quarter = Quarter::parse(&format!("Q{}", &captures[1]))?;
        let year = FiscalYear::parse(&captures[2])?;
        Some(Self { quarter, year })
    }

    /// Compact label used in prompts and answers ("Q3FY25").
    pub fn label(&self) -> String {
        format!("{}{}", self.quarter, self.year)
    }

    /// Calendar date range the quarter covers.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let fy = i32::from(self.year.0);
        let (start, end) = match self.quarter {
            Quarter::Q1 => ((fy - 1, 4, 1), (fy - 1, 6, 30)),
            Quarter::Q2 => ((fy - 1, 7, 1), (fy - 1, 9, 30)),
            Quarter::Q3 => ((fy - 1, 10, 1), (fy - 1, 12, 31)),
            Quarter::Q4 => ((fy, 1, 1), (fy, 3, 31)),
        };
        (date(start), date(end))
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn date((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("static calendar date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_variants() {
        assert_eq!(Quarter::parse("Q3"), Some(Quarter::Q3));
        assert_eq!(Quarter::parse("3rd"), Some(Quarter::Q3));
        assert_eq!(Quarter::parse("first"), Some(Quarter::Q1));
        assert_eq!(Quarter::parse("4"), Some(Quarter::Q4));
        assert_eq!(Quarter::parse("Q5"), None);
    }

    #[test]
    fn test_fiscal_year_formats() {
        assert_eq!(FiscalYear::parse("2025"), Some(FiscalYear(2025)));
        assert_eq!(FiscalYear::parse("FY25"), Some(FiscalYear(2025)));
        assert_eq!(FiscalYear::parse("25"), Some(FiscalYear(2025)));
        assert_eq!(FiscalYear::parse("1925"), None);
        assert_eq!(FiscalYear::parse("banana"), None);
    }

    #[test]
    fn test_period_parsing() {
        let period = ReportPeriod::parse("Q3FY25").unwrap();
        assert_eq!(period.quarter, Quarter::Q3);
        assert_eq!(period.year, FiscalYear(2025));

        assert_eq!(ReportPeriod::parse("Q3 FY25"), Some(period));
        assert_eq!(ReportPeriod::parse("q3 fy 25"), Some(period));
        assert_eq!(ReportPeriod::parse("Q3 2025"), Some(period));
        assert_eq!(ReportPeriod::parse("no period here"), None);
    }

    #[test]
    fn test_label() {
        let period = ReportPeriod::parse("Q3 FY25").unwrap();
        assert_eq!(period.label(), "Q3FY25");
    }

    #[test]
    fn test_date_ranges() {
        let q1 = ReportPeriod::parse("Q1FY25").unwrap().date_range();
        assert_eq!(q1.0, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(q1.1, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

        let q4 = ReportPeriod::parse("Q4FY25").unwrap().date_range();
        assert_eq!(q4.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(q4.1, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }
}
