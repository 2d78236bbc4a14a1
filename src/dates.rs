//! Date parsing and display helpers
//!
//! Input dates are read day-first (Australian order). Storage and tool
//! output use ISO `YYYY-MM-DD`.

use crate::error::{TimelineError, TimelineResult};
use chrono::{Datelike, NaiveDate};

/// Earliest year accepted for an event
pub const MIN_YEAR: i32 = 1900;
/// Latest year accepted for an event
pub const MAX_YEAR: i32 = 2100;

/// Two-digit years up to this value are read as 20xx, later ones as 19xx
const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// Worded formats tried after the numeric ones
const WORDED_FORMATS: [&str; 4] = ["%d %b %Y", "%d %B %Y", "%B %d, %Y", "%b %d, %Y"];

fn expand_year(short: i32) -> i32 {
    if short <= TWO_DIGIT_YEAR_PIVOT {
        2000 + short
    } else {
        1900 + short
    }
}

fn number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `DDMMYYYY`, `DDMMYY` or `DDMYY`
fn parse_compact(s: &str) -> Option<NaiveDate> {
    let (day, month, year) = match s.len() {
        8 => (number(&s[0..2])?, number(&s[2..4])?, number(&s[4..8])? as i32),
        6 => (number(&s[0..2])?, number(&s[2..4])?, expand_year(number(&s[4..6])? as i32)),
        5 => (number(&s[0..2])?, number(&s[2..3])?, expand_year(number(&s[3..5])? as i32)),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `d/M/yyyy`, `d-M-yyyy`, `d/M/yy` and ISO `yyyy-MM-dd`
fn parse_separated(s: &str) -> Option<NaiveDate> {
    let separator = if s.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = s.split(separator).map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }

    if parts[0].len() == 4 {
        let year = number(parts[0])? as i32;
        return NaiveDate::from_ymd_opt(year, number(parts[1])?, number(parts[2])?);
    }
    if parts[0].len() > 2 || parts[1].len() > 2 {
        return None;
    }

    let year = match parts[2].len() {
        2 => expand_year(number(parts[2])? as i32),
        4 => number(parts[2])? as i32,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, number(parts[1])?, number(parts[0])?)
}

/// Parse a date typed in any of the accepted formats
///
/// Accepts compact digits (`14032008`, `140308`, `14308`), day-first
/// numeric dates with `/` or `-`, worded dates (`15 Jan 2023`,
/// `15 January 2023`, `January 15, 2023`) and ISO dates.
///
/// # Returns
/// The date, or `None` when no format matches
pub fn parse_date_flexible(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return parse_compact(trimmed);
    }

    if let Some(date) = parse_separated(trimmed) {
        return Some(date);
    }

    WORDED_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Check a date is inside the supported year range
pub fn validate_date_range(date: NaiveDate) -> TimelineResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(TimelineError::DateOutOfRange(date));
    }
    Ok(())
}

/// Parse and range-check a date
pub fn parse_date(input: &str) -> TimelineResult<NaiveDate> {
    let date = parse_date_flexible(input)
        .ok_or_else(|| TimelineError::InvalidDate(input.trim().to_string()))?;
    validate_date_range(date)?;
    Ok(date)
}

/// Long display form, e.g. "Monday, 15 January 2023"
pub fn format_date_display(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

/// Short day-first form used in messages, e.g. "15/01/2023"
pub fn format_date_short(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compact_formats() {
        assert_eq!(parse_date_flexible("14032008"), Some(date(2008, 3, 14)));
        assert_eq!(parse_date_flexible("140308"), Some(date(2008, 3, 14)));
        assert_eq!(parse_date_flexible("14308"), Some(date(2008, 3, 14)));
        assert_eq!(parse_date_flexible("140399"), Some(date(1999, 3, 14)));
        // 31 February does not exist
        assert_eq!(parse_date_flexible("31022008"), None);
        assert_eq!(parse_date_flexible("1234"), None);
    }

    #[test]
    fn test_separated_formats() {
        assert_eq!(parse_date_flexible("15/01/2023"), Some(date(2023, 1, 15)));
        assert_eq!(parse_date_flexible("15/1/2023"), Some(date(2023, 1, 15)));
        assert_eq!(parse_date_flexible("15-01-2023"), Some(date(2023, 1, 15)));
        assert_eq!(parse_date_flexible("2023-01-15"), Some(date(2023, 1, 15)));
        assert_eq!(parse_date_flexible("15/01/23"), Some(date(2023, 1, 15)));
        assert_eq!(parse_date_flexible("15/1/75"), Some(date(1975, 1, 15)));
    }

    #[test]
    fn test_day_first_order() {
        // 03/04 is the 3rd of April, not March 4th
        assert_eq!(parse_date_flexible("03/04/2020"), Some(date(2020, 4, 3)));
        assert_eq!(parse_date_flexible("13/13/2020"), None);
    }

    #[test]
    fn test_worded_formats() {
        assert_eq!(parse_date_flexible("15 Jan 2023"), Some(date(2023, 1, 15)));
        assert_eq!(
            parse_date_flexible("15 January 2023"),
            Some(date(2023, 1, 15))
        );
        assert_eq!(
            parse_date_flexible("January 15, 2023"),
            Some(date(2023, 1, 15))
        );
        assert_eq!(parse_date_flexible("not a date"), None);
        assert_eq!(parse_date_flexible("   "), None);
    }

    #[test]
    fn test_range_checks() {
        assert!(parse_date("01/01/1899").is_err());
        assert!(parse_date("01/01/2101").is_err());
        assert!(parse_date("01/01/1900").is_ok());
        assert_eq!(parse_date("14032008"), Ok(date(2008, 3, 14)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format_date_display(date(2023, 1, 16)),
            "Monday, 16 January 2023"
        );
        assert_eq!(format_date_short(date(2023, 1, 6)), "06/01/2023");
    }
}
