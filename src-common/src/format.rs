//! Display formatting helpers shared by every view.
//!
//! Missing or non-finite numbers render as [`MISSING`] so tables never show
//! `NaN` or `inf`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// Placeholder for absent numeric values.
pub const MISSING: &str = "–";

/// Parse a backend timestamp into local time.
///
/// Accepts RFC 3339 (`2024-03-05T10:00:00Z`), naive ISO date-times (read as
/// local time) and bare dates (local midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// `05 Mar 2024, 10:00` in local time, `Unknown` when absent, the raw input
/// when it does not parse.
pub fn format_date_time(iso: Option<&str>) -> String {
    let Some(raw) = iso.filter(|s| !s.is_empty()) else {
        return "Unknown".to_string();
    };
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%d %b %Y, %H:%M").to_string(),
        None => raw.to_string(),
    }
}

/// `05 Mar 2024`, with the same fallbacks as [`format_date_time`].
pub fn format_date_only(iso: Option<&str>) -> String {
    let Some(raw) = iso.filter(|s| !s.is_empty()) else {
        return "Unknown".to_string();
    };
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%d %b %Y").to_string(),
        None => raw.to_string(),
    }
}

/// Split on commas, trim, drop empties and drop case-insensitive duplicates.
/// The first spelling of a tag wins.
pub fn normalize_tags_from_string(input: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn finite(n: Option<f64>) -> Option<f64> {
    n.filter(|v| v.is_finite())
}

/// Fraction in 0..1 rendered as a percentage with one decimal.
pub fn fmt_pct01(n: Option<f64>) -> String {
    match finite(n) {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => MISSING.to_string(),
    }
}

pub fn fmt_num(n: Option<f64>, digits: usize) -> String {
    match finite(n) {
        Some(v) => format!("{:.*}", digits, v),
        None => MISSING.to_string(),
    }
}

pub fn fmt_seconds(n: Option<f64>) -> String {
    match finite(n) {
        Some(v) => format!("{:.2}s", v),
        None => MISSING.to_string(),
    }
}

/// Playback clock, `m:ss`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Elapsed recording time, `mm:ss`.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Cut `s` to at most `max` characters, ending in `...` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let head: String = s.chars().take(max - 3).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_time_fallbacks() {
        assert_eq!(format_date_time(None), "Unknown");
        assert_eq!(format_date_time(Some("")), "Unknown");
        assert_eq!(format_date_time(Some("not a date")), "not a date");
    }

    #[test]
    fn test_format_date_time_naive_is_local() {
        assert_eq!(
            format_date_time(Some("2024-03-05T10:07:00")),
            "05 Mar 2024, 10:07"
        );
        assert_eq!(format_date_only(Some("2024-03-05")), "05 Mar 2024");
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2024-03-05T10:00:00Z").unwrap();
        assert_eq!(parsed.timestamp(), 1_709_632_800);
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags_from_string(" Work, work ,, Family,WORK , health"),
            vec!["Work", "Family", "health"]
        );
        assert!(normalize_tags_from_string(" , ,").is_empty());
        assert_eq!(
            normalize_tags_from_string("School, anxiety, School"),
            vec!["School", "anxiety"]
        );
    }

    #[test]
    fn test_numeric_formatters() {
        assert_eq!(fmt_pct01(Some(0.1234)), "12.3%");
        assert_eq!(fmt_pct01(Some(f64::NAN)), MISSING);
        assert_eq!(fmt_pct01(None), MISSING);
        assert_eq!(fmt_num(Some(0.91237), 3), "0.912");
        assert_eq!(fmt_num(Some(f64::INFINITY), 3), MISSING);
        assert_eq!(fmt_seconds(Some(1.2)), "1.20s");
        assert_eq!(fmt_seconds(None), MISSING);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_elapsed(125), "02:05");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }
}
