//! Small formatting helpers shared by the providers.

use chrono::{DateTime, Datelike, Utc};

/// Truncates a string to a maximum character count with ellipsis.
///
/// Counts characters, not bytes. The ellipsis counts toward `max_chars`.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }

    let keep_chars = max_chars.saturating_sub(3);
    let truncated: String = s.chars().take(keep_chars).collect();
    format!("{}...", truncated)
}

/// English ordinal suffix for a day of the month
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Format a release date as `May 1st, 2017`
pub fn format_release_date(date: DateTime<Utc>) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_no_truncation_needed() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 10), "");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hello", 3), "...");
        assert_eq!(truncate_string("日本語test", 5), "日本...");
    }

    #[test]
    fn test_ordinal_suffix() {
        let cases = [
            (1, "st"),
            (2, "nd"),
            (3, "rd"),
            (4, "th"),
            (11, "th"),
            (12, "th"),
            (13, "th"),
            (21, "st"),
            (22, "nd"),
            (23, "rd"),
            (30, "th"),
            (31, "st"),
        ];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {}", day);
        }
    }

    #[test]
    fn test_format_release_date() {
        let date = Utc.with_ymd_and_hms(2017, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(format_release_date(date), "May 1st, 2017");
        let date = Utc.with_ymd_and_hms(2020, 12, 12, 0, 0, 0).unwrap();
        assert_eq!(format_release_date(date), "December 12th, 2020");
    }
}
