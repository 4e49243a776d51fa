//! NBA season labels.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First calendar month of a season. Dates from October on belong to the
/// season starting that year; earlier dates belong to the previous one.
pub const SEASON_START_MONTH: u32 = 10;

/// An NBA season, rendered as `YYYY-YY` (e.g. `2023-24`).
///
/// Labels are only well-formed for start years 0 through 9999. Keys parsed by
/// [`parse_key`](super::parse_key) always fall in that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season {
    start_year: i32,
}

/// Error returned when a season label is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid season label '{0}', expected YYYY-YY with consecutive years")]
pub struct ParseSeasonError(String);

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The season a calendar date falls in.
    pub fn for_date(date: NaiveDate) -> Self {
        if date.month() >= SEASON_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}",
            self.start_year,
            self.end_year().rem_euclid(100)
        )
    }
}

impl FromStr for Season {
    type Err = ParseSeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseSeasonError(s.to_string());

        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        if start.len() != 4
            || end.len() != 2
            || !start.bytes().all(|b| b.is_ascii_digit())
            || !end.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let end_suffix: i32 = end.parse().map_err(|_| invalid())?;
        if (start_year + 1) % 100 != end_suffix {
            return Err(invalid());
        }
        Ok(Self::new(start_year))
    }
}

impl TryFrom<String> for Season {
    type Error = ParseSeasonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mid_season_date() {
        assert_eq!(Season::for_date(date(2024, 1, 15)).to_string(), "2023-24");
    }

    #[test]
    fn test_october_boundary() {
        assert_eq!(Season::for_date(date(2023, 9, 30)).to_string(), "2022-23");
        assert_eq!(Season::for_date(date(2023, 10, 1)).to_string(), "2023-24");
        assert_eq!(Season::for_date(date(2023, 12, 31)).to_string(), "2023-24");
        assert_eq!(Season::for_date(date(2024, 1, 1)).to_string(), "2023-24");
    }

    #[test]
    fn test_offseason_belongs_to_previous_season() {
        assert_eq!(Season::for_date(date(2024, 6, 20)).to_string(), "2023-24");
        assert_eq!(Season::for_date(date(2024, 8, 1)).to_string(), "2023-24");
    }

    #[test]
    fn test_century_rollover() {
        assert_eq!(Season::new(1999).to_string(), "1999-00");
        assert_eq!("1999-00".parse::<Season>().unwrap(), Season::new(1999));
    }

    #[test]
    fn test_earliest_parseable_season() {
        assert_eq!(Season::for_date(date(1, 1, 1)).to_string(), "0000-01");
        assert_eq!("0000-01".parse::<Season>().unwrap(), Season::new(0));
    }

    #[test]
    fn test_deterministic() {
        let d = date(2021, 3, 4);
        assert_eq!(Season::for_date(d), Season::for_date(d));
    }

    #[test]
    fn test_parse_label() {
        let season: Season = "2023-24".parse().unwrap();
        assert_eq!(season.start_year(), 2023);
        assert_eq!(season.end_year(), 2024);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for label in ["2023-25", "2023", "23-24", "2023-2024", "abcd-ef", "2023_24", ""] {
            assert!(label.parse::<Season>().is_err(), "accepted {label}");
        }
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&Season::new(2023)).unwrap();
        assert_eq!(json, "\"2023-24\"");
        let back: Season = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Season::new(2023));
        assert!(serde_json::from_str::<Season>("\"2023-26\"").is_err());
    }
}
