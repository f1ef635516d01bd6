//! Date string normalization
//!
//! Accepted input shapes, rewritten to zero-padded `YYYY-MM-DD`:
//!
//! | Shape      | Example      | Result       |
//! |------------|--------------|--------------|
//! | `YYYY-M-D` | `2024-1-5`   | `2024-01-05` |
//! | `D-M-YYYY` | `31-12-2024` | `2024-12-31` |
//! | `M/D/YYYY` | `12/1/2024`  | `2024-12-01` |
//!
//! A four-digit first segment means year-first. Dash-separated two-digit
//! first segments are always day-first and slash-separated ones month-first;
//! there is no locale detection, so `01-02-2024` is 1 February.
//! Anything else is returned trimmed but otherwise unchanged.

use std::sync::OnceLock;

use chrono::NaiveDate;

const CANONICAL_FORMAT: &str = "%Y-%m-%d";

struct DatePatterns {
    year_first: regex::Regex,
    day_first: regex::Regex,
    month_first: regex::Regex,
    canonical: regex::Regex,
}

fn patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| DatePatterns {
        year_first: regex::Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("Invalid regex"),
        day_first: regex::Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("Invalid regex"),
        month_first: regex::Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("Invalid regex"),
        canonical: regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid regex"),
    })
}

fn canonical(year: &str, month: &str, day: &str) -> String {
    format!("{}-{:0>2}-{:0>2}", year, month, day)
}

/// Normalize a date string; `None` only for blank input
pub fn normalize_date(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let p = patterns();
    if let Some(c) = p.year_first.captures(s) {
        return Some(canonical(&c[1], &c[2], &c[3]));
    }
    if let Some(c) = p.day_first.captures(s) {
        return Some(canonical(&c[3], &c[2], &c[1]));
    }
    if let Some(c) = p.month_first.captures(s) {
        return Some(canonical(&c[3], &c[1], &c[2]));
    }
    Some(s.to_string())
}

/// Whether `s` has the zero-padded `YYYY-MM-DD` shape
pub fn looks_like_canonical_date(s: &str) -> bool {
    patterns().canonical.is_match(s)
}

/// A calendar-valid canonical date with its following day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    pub start: String,
    pub next: String,
}

impl DayWindow {
    /// Normalize `input` and build the `[d, d+1)` window, or `None` if it is
    /// not a real calendar date (e.g. `2024-02-30` or an ISO datetime)
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = normalize_date(input)?;
        if !looks_like_canonical_date(&normalized) {
            return None;
        }
        let date = NaiveDate::parse_from_str(&normalized, CANONICAL_FORMAT).ok()?;
        let next = date.succ_opt()?;
        Some(Self {
            start: normalized,
            next: next.format(CANONICAL_FORMAT).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_known_cases() {
        assert_eq!(normalize_date("31-12-2024").as_deref(), Some("2024-12-31"));
        assert_eq!(normalize_date("2024-1-5").as_deref(), Some("2024-01-05"));
        assert_eq!(normalize_date("12/1/2024").as_deref(), Some("2024-12-01"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for input in ["31-12-2024", "2024-1-5", "12/1/2024", "2024-06-01", "1-2-2024"] {
            let once = normalize_date(input).unwrap();
            let twice = normalize_date(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_ambiguous_dash_date_is_day_first() {
        assert_eq!(normalize_date("01-02-2024").as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_other_shapes_pass_through_trimmed() {
        assert_eq!(
            normalize_date(" 2024-06-01T10:00:00Z ").as_deref(),
            Some("2024-06-01T10:00:00Z")
        );
        assert_eq!(normalize_date("yesterday").as_deref(), Some("yesterday"));
        assert_eq!(normalize_date("   "), None);
        assert_eq!(normalize_date(""), None);
    }

    #[test]
    fn test_canonical_shape_check() {
        assert!(looks_like_canonical_date("2024-06-01"));
        assert!(!looks_like_canonical_date("2024-6-1"));
        assert!(!looks_like_canonical_date("2024-06-01T00:00:00"));
    }

    #[test]
    fn test_day_window_crosses_month_and_year() {
        let w = DayWindow::parse("31-12-2024").unwrap();
        assert_eq!(w.start, "2024-12-31");
        assert_eq!(w.next, "2025-01-01");

        let w = DayWindow::parse("2024-2-28").unwrap();
        assert_eq!(w.next, "2024-02-29");
    }

    #[test]
    fn test_day_window_rejects_impossible_dates() {
        assert!(DayWindow::parse("2024-02-30").is_none());
        assert!(DayWindow::parse("2024-06-01T10:00:00Z").is_none());
        assert!(DayWindow::parse("42").is_none());
    }
}
