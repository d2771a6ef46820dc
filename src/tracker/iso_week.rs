//! ISO-8601 week identifiers (`YYYY-Www`).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};

/// A validated ISO week. Ordering is chronological, and so is the ordering of
/// the canonical string form, which is what the week index relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    /// Build a week, checking that it exists in that ISO year.
    pub fn new(year: i32, week: u32) -> Option<Self> {
        if !(1000..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
        Some(Self { year, week })
    }

    /// The ISO week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

/// Why a week identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoWeekParseError(String);

impl fmt::Display for IsoWeekParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ISO week '{}', expected YYYY-Www", self.0)
    }
}

impl std::error::Error for IsoWeekParseError {}

impl FromStr for IsoWeek {
    type Err = IsoWeekParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || IsoWeekParseError(s.to_string());

        let (year, week) = s.split_once("-W").ok_or_else(err)?;
        if year.len() != 4 || week.len() != 2 {
            return Err(err());
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !week.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let year: i32 = year.parse().map_err(|_| err())?;
        let week: u32 = week.parse().map_err(|_| err())?;
        IsoWeek::new(year, week).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let week: IsoWeek = "2024-W05".parse().unwrap();
        assert_eq!(week, IsoWeek::new(2024, 5).unwrap());
        assert_eq!(week.to_string(), "2024-W05");
    }

    #[test]
    fn test_week_53_only_in_long_years() {
        // 2020 has 53 ISO weeks, 2021 has 52
        assert!("2020-W53".parse::<IsoWeek>().is_ok());
        assert!("2021-W53".parse::<IsoWeek>().is_err());
    }

    #[test]
    fn test_rejects_malformed_identifiers() {
        for raw in [
            "", "2024", "2024-05", "2024-W5", "2024-W005", "24-W05", "2024-w05", "2024-W00",
            "2024-W54", "abcd-W01", "2024-W+1",
        ] {
            assert!(raw.parse::<IsoWeek>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_from_date_uses_iso_year() {
        // 2021-01-03 is a Sunday still in the last ISO week of 2020
        let date = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
        assert_eq!(IsoWeek::from_date(date).to_string(), "2020-W53");

        // 2024-12-30 is a Monday already in ISO week 1 of 2025
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(IsoWeek::from_date(date).to_string(), "2025-W01");
    }

    #[test]
    fn test_string_order_matches_week_order() {
        let mut weeks: Vec<IsoWeek> = ["2024-W10", "2023-W52", "2024-W02"]
            .iter()
            .map(|w| w.parse().unwrap())
            .collect();
        weeks.sort();
        let as_strings: Vec<String> = weeks.iter().map(|w| w.to_string()).collect();
        let mut sorted_strings = as_strings.clone();
        sorted_strings.sort();
        assert_eq!(as_strings, sorted_strings);
        assert_eq!(as_strings, vec!["2023-W52", "2024-W02", "2024-W10"]);
    }
}
