//! Day-first date/time normalization.
//!
//! Extract timestamps arrive in whatever shape the exporting system chose:
//! `01/04/2020`, `1-4-20 13:45`, `01.Apr.2020 1:45 PM`, or ISO 8601 with an
//! offset. Every value is normalized to a UTC instant rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. Anything that cannot be read as a date becomes
//! `None`; an unparseable timestamp is an expected value, not an error.
//!
//! Two-digit years follow chrono's `%y` pivot, so `20` reads as 2020 and
//! `85` as 1985.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rayon::prelude::*;

/// Canonical rendering of a normalized instant.
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Rendering of the date half of a split timestamp.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_SEPARATORS: [&str; 4] = ["/", "-", ".", " "];
const DATE_TIME_JOINS: [&str; 2] = [" ", "T"];
const TIME_FORMATS: [&str; 5] = [
    "%H:%M",
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%I:%M %p",
    "%I:%M:%S %p",
];

struct FormatTable {
    date: Vec<String>,
    datetime: Vec<String>,
}

/// Day-first layouts are tried before year-first so that `01-04-20` reads as
/// 1 April 2020. Within a layout `%y` precedes `%Y`: chrono's `%Y` accepts a
/// two-digit year as-is (year 20 AD), while `%y` rejects four digits.
fn formats() -> &'static FormatTable {
    static FORMATS: OnceLock<FormatTable> = OnceLock::new();
    FORMATS.get_or_init(|| {
        let mut date = Vec::new();
        for sep in DATE_SEPARATORS {
            for month in ["%m", "%b"] {
                for year in ["%y", "%Y"] {
                    date.push(format!("%d{sep}{month}{sep}{year}"));
                }
            }
        }
        for sep in DATE_SEPARATORS {
            date.push(format!("%Y{sep}%m{sep}%d"));
        }

        let mut datetime = Vec::with_capacity(date.len() * TIME_FORMATS.len() * 2);
        for date_fmt in &date {
            for join in DATE_TIME_JOINS {
                for time_fmt in TIME_FORMATS {
                    datetime.push(format!("{date_fmt}{join}{time_fmt}"));
                }
            }
        }
        FormatTable { date, datetime }
    })
}

/// ISO 8601 with an explicit offset (or `Z`), converted to UTC.
fn parse_offset_iso(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_utc());
        }
    }
    None
}

/// Parse a loosely formatted day-first timestamp.
///
/// Date-only values resolve to midnight. Empty strings, bare numbers and
/// time-only values yield `None`.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.parse::<f64>().is_ok() {
        return None;
    }
    if let Some(dt) = parse_offset_iso(trimmed) {
        return Some(dt);
    }
    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    let table = formats();
    if naive.contains(':') {
        table
            .datetime
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
    } else {
        table
            .date
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(naive, fmt).ok())
            .map(|date| date.and_time(NaiveTime::MIN))
    }
}

/// Render an instant in the canonical `YYYY-MM-DDTHH:MM:SSZ` form.
pub fn format_instant(instant: NaiveDateTime) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

/// Normalize one value to its canonical instant string.
pub fn normalize_datetime(value: &str) -> Option<String> {
    parse_instant(value).map(format_instant)
}

/// Split an instant into a `YYYY-MM-DD` date and a decimal-hours time.
///
/// `13:30` becomes `13.5`. Used by the legacy schema, which stores the two
/// halves in separate columns.
pub fn split_date_time(instant: NaiveDateTime) -> (String, f64) {
    let time = instant.time();
    let hours = f64::from(time.hour())
        + f64::from(time.minute()) / 60.0
        + f64::from(time.second()) / 3600.0;
    (instant.format(DATE_FORMAT).to_string(), hours)
}

/// Parse a column of values on the rayon pool.
///
/// Each value is tagged with its row position before the parallel map and the
/// results are sorted by that tag, so the output is in input order whatever
/// order the workers finish in.
pub fn normalize_values<S>(values: &[Option<S>]) -> Vec<Option<NaiveDateTime>>
where
    S: AsRef<str> + Sync,
{
    let mut tagged: Vec<(usize, Option<NaiveDateTime>)> = values
        .par_iter()
        .enumerate()
        .map(|(idx, value)| {
            let instant = value.as_ref().and_then(|v| parse_instant(v.as_ref()));
            (idx, instant)
        })
        .collect();
    tagged.sort_unstable_by_key(|(idx, _)| *idx);
    tagged.into_iter().map(|(_, instant)| instant).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(value: &str) -> Option<String> {
        normalize_datetime(value)
    }

    #[test]
    fn test_day_first_separators() {
        assert_eq!(norm("01/04/2020").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(norm("01-04-2020").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(norm("01.04.2020").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(norm("01 04 2020").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(norm("1/4/2020").as_deref(), Some("2020-04-01T00:00:00Z"));
    }

    #[test]
    fn test_date_and_time() {
        assert_eq!(
            norm("01/04/2020 13:45").as_deref(),
            Some("2020-04-01T13:45:00Z")
        );
        assert_eq!(
            norm(" 25-12-2020 07:05:09 ").as_deref(),
            Some("2020-12-25T07:05:09Z")
        );
        assert_eq!(
            norm("01/04/2020 1:45 PM").as_deref(),
            Some("2020-04-01T13:45:00Z")
        );
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(norm("01/04/20").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(norm("01/04/85").as_deref(), Some("1985-04-01T00:00:00Z"));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(norm("01-Apr-2020").as_deref(), Some("2020-04-01T00:00:00Z"));
        assert_eq!(
            norm("1 April 2020 09:00").as_deref(),
            Some("2020-04-01T09:00:00Z")
        );
    }

    #[test]
    fn test_iso_inputs() {
        assert_eq!(
            norm("2020-04-01 13:45:00").as_deref(),
            Some("2020-04-01T13:45:00Z")
        );
        assert_eq!(
            norm("2020-04-01T13:45:00Z").as_deref(),
            Some("2020-04-01T13:45:00Z")
        );
        assert_eq!(
            norm("2020-04-01T13:45:00+01:00").as_deref(),
            Some("2020-04-01T12:45:00Z")
        );
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(norm(""), None);
        assert_eq!(norm("   "), None);
        assert_eq!(norm("0"), None);
        assert_eq!(norm("-1"), None);
        assert_eq!(norm("NaN"), None);
        assert_eq!(norm("not a date"), None);
        assert_eq!(norm("13:45"), None);
        assert_eq!(norm("32/01/2020"), None);
    }

    #[test]
    fn test_split_date_time() {
        let instant = parse_instant("01/04/2020 13:30").unwrap();
        assert_eq!(split_date_time(instant), ("2020-04-01".to_string(), 13.5));
    }

    #[test]
    fn test_normalize_values_keeps_row_order() {
        let values: Vec<Option<String>> = (1..=28)
            .map(|day| Some(format!("{day:02}/02/2021")))
            .chain([None, Some("garbage".to_string())])
            .collect();
        let parsed = normalize_values(&values);
        assert_eq!(parsed.len(), 30);
        for (idx, instant) in parsed.iter().take(28).enumerate() {
            let expected = format!("2021-02-{:02}T00:00:00Z", idx + 1);
            assert_eq!(instant.map(format_instant), Some(expected));
        }
        assert_eq!(parsed[28], None);
        assert_eq!(parsed[29], None);
    }
}
