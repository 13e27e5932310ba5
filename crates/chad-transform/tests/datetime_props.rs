//! Property tests for timestamp normalization.

use chad_transform::datetime::{format_instant, normalize_datetime, parse_instant};
use chrono::{Datelike, NaiveDate, Timelike};
use proptest::prelude::*;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("/"), Just("-"), Just("."), Just(" ")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_day_first_dates_keep_calendar_date_and_minute(
        year in 1970i32..2069,
        month in 1u32..=12,
        day in 1u32..=28,
        hour in 0u32..24,
        minute in 0u32..60,
        sep in separator(),
        month_name in any::<bool>(),
        with_time in any::<bool>(),
    ) {
        let month_text = if month_name {
            MONTHS[(month - 1) as usize].to_string()
        } else {
            format!("{month:02}")
        };
        let mut input = format!("{day:02}{sep}{month_text}{sep}{year}");
        if with_time {
            input.push_str(&format!(" {hour:02}:{minute:02}"));
        }

        let instant = parse_instant(&input);
        prop_assert!(instant.is_some(), "failed to parse {input:?}");
        let instant = instant.unwrap_or_default();
        prop_assert_eq!(instant.date(), NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default());
        let (expected_hour, expected_minute) = if with_time { (hour, minute) } else { (0, 0) };
        prop_assert_eq!(instant.hour(), expected_hour);
        prop_assert_eq!(instant.minute(), expected_minute);

        // the canonical form parses back to the same instant
        let canonical = format_instant(instant);
        prop_assert_eq!(parse_instant(&canonical), Some(instant));
    }

    #[test]
    fn prop_two_digit_years_pivot(
        year in prop_oneof![0i32..60, 80i32..100],
        month in 1u32..=12,
        day in 1u32..=28,
    ) {
        let input = format!("{day:02}/{month:02}/{year:02}");
        let instant = parse_instant(&input);
        prop_assert!(instant.is_some());
        let expected = if year < 60 { 2000 + year } else { 1900 + year };
        prop_assert_eq!(instant.map(|i| i.year()), Some(expected));
    }

    #[test]
    fn prop_blank_and_numeric_inputs_are_null(spaces in " {0,4}", number in any::<i32>()) {
        prop_assert_eq!(normalize_datetime(&spaces), None);
        prop_assert_eq!(normalize_datetime(&number.to_string()), None);
    }
}
