//! Business clock.
//!
//! Report dates and month tokens follow the company's home timezone
//! (UTC+8), regardless of where the server runs. A report submitted at
//! 23:30 Beijing time on the 31st must land in that month, not the next.

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

fn beijing_offset() -> FixedOffset {
    // Safe: 8h is within FixedOffset's ±24h range.
    FixedOffset::east_opt(BEIJING_OFFSET_SECS).expect("valid UTC+8 offset")
}

/// Today's date in Beijing time, formatted `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now()
        .with_timezone(&beijing_offset())
        .format("%Y-%m-%d")
        .to_string()
}

/// The current reporting month in Beijing time, formatted `YYYY-MM`.
pub fn current_month() -> String {
    Utc::now()
        .with_timezone(&beijing_offset())
        .format("%Y-%m")
        .to_string()
}

/// Validate a month token (`YYYY-MM`, calendar-valid month).
///
/// Examples: `2026-08` is valid; `2026-13`, `2026-8`, `202608` are not.
pub fn is_valid_month(token: &str) -> bool {
    let Some((year, month)) = token.split_once('-') else {
        return false;
    };
    if year.len() != 4 || month.len() != 2 {
        return false;
    }
    let (Ok(y), Ok(m)) = (year.parse::<i32>(), month.parse::<u32>()) else {
        return false;
    };
    NaiveDate::from_ymd_opt(y, m, 1).is_some()
}

/// Validate a report date (`YYYY-MM-DD`, calendar-valid).
pub fn is_valid_date(token: &str) -> bool {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").is_ok()
}

/// The month token a date belongs to, if the date parses.
pub fn month_of(date: &str) -> Option<String> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(format!("{:04}-{:02}", d.year(), d.month()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_month_tokens() {
        assert!(is_valid_month("2026-08"));
        assert!(is_valid_month("2026-12"));
        assert!(is_valid_month("1999-01"));
    }

    #[test]
    fn test_invalid_month_tokens() {
        assert!(!is_valid_month("2026-13"));
        assert!(!is_valid_month("2026-00"));
        assert!(!is_valid_month("2026-8"));
        assert!(!is_valid_month("202608"));
        assert!(!is_valid_month("2026/08"));
        assert!(!is_valid_month(""));
    }

    #[test]
    fn test_today_shape() {
        let t = today();
        assert!(is_valid_date(&t));
        assert_eq!(month_of(&t).unwrap(), current_month());
    }

    #[test]
    fn test_month_of() {
        assert_eq!(month_of("2026-08-25").as_deref(), Some("2026-08"));
        assert_eq!(month_of("2026-8-25"), None);
    }
}
