// Type coercion for raw string cells

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Trim a cell; empty and pandas-style null spellings become `None`.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("<na>") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collapse internal whitespace runs to a single space, then trim.
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw, " ").trim().to_string()
}

/// Parse a price cell. Currency symbols are stripped and the free tokens map
/// to zero. Returns `None` for anything non-numeric or non-finite.
pub fn parse_price(raw: &str, free_tokens: &[&str], currency_symbols: &[char]) -> Option<f64> {
    let trimmed = raw.trim();
    if free_tokens.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        return Some(0.0);
    }
    let stripped: String = trimmed
        .chars()
        .filter(|c| !currency_symbols.contains(c) && *c != ',')
        .collect();
    let stripped = stripped.trim();
    if free_tokens.iter().any(|t| stripped.eq_ignore_ascii_case(t)) {
        return Some(0.0);
    }
    stripped.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Parse a non-negative review count; integral floats such as `"12.0"` are accepted.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Some(f as u64),
        _ => None,
    }
}

/// Tolerant boolean: `true`, `1`, `yes` (any case) are true; everything else is false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%Y-%m-%dT%H:%M:%S",
];

// Month-precision spellings, parsed against day 1
const MONTH_FORMATS: &[&str] = &["%b %Y", "%B %Y", "%Y-%m"];

/// Heuristic release-date parser. Whitespace is collapsed first; the first
/// format that parses wins. Unparsable text yields `None`.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, fmt) {
            return Some(date);
        }
    }
    // Timestamps with a trailing zone or fraction: keep the date part
    if let Some((day, _)) = text.split_once('T').or_else(|| text.split_once(' ')) {
        if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return Some(date);
        }
    }
    for fmt in MONTH_FORMATS {
        let padded = format!("1 {}", text);
        let fmt_padded = format!("%d {}", fmt);
        if let Ok(date) = NaiveDate::parse_from_str(&padded, &fmt_padded) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const FREE: &[&str] = &["Free to Play", "Free"];
    const CURRENCY: &[char] = &['$', '€', '£'];

    #[test]
    fn test_price_tokens_and_symbols() {
        assert_eq!(parse_price("$19.99", FREE, CURRENCY), Some(19.99));
        assert_eq!(parse_price(" Free to Play ", FREE, CURRENCY), Some(0.0));
        assert_eq!(parse_price("free", FREE, CURRENCY), Some(0.0));
        assert_eq!(parse_price("$1,299.00", FREE, CURRENCY), Some(1299.0));
        assert_eq!(parse_price("n/a", FREE, CURRENCY), None);
        assert_eq!(parse_price("", FREE, CURRENCY), None);
        assert_eq!(parse_price("inf", FREE, CURRENCY), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Oct   21,\t2008 "), "Oct 21, 2008");
    }

    #[test]
    fn test_parse_release_date_formats() {
        let cases = [
            ("Oct 21, 2008", 10),
            ("21 Oct, 2008", 10),
            ("2019-03-05", 3),
            ("July 4, 2020", 7),
            ("12/25/2015", 12),
            ("Aug  2017", 8),
            ("2021-06-01 00:00:00", 6),
        ];
        for (raw, month) in cases {
            let date = parse_release_date(raw).unwrap_or_else(|| panic!("failed to parse {}", raw));
            assert_eq!(date.month(), month, "{}", raw);
        }
        assert_eq!(parse_release_date("coming soon"), None);
        assert_eq!(parse_release_date("0 - 20000"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("1.5"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_parse_flag_encodings() {
        for truthy in ["true", "TRUE", "1", "Yes", " yes "] {
            assert!(parse_flag(truthy), "{}", truthy);
        }
        for falsy in ["false", "0", "no", "", "y", "True!"] {
            assert!(!parse_flag(falsy), "{}", falsy);
        }
    }
}
