//! Date string parsing for the date rules.
//!
//! A date string is split into day, month and year according to the session's
//! [`DateFormat`]. Parsing never fails loudly: anything that does not match the
//! format yields `None`, and the date rules treat `None` as a failed check.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Average Gregorian year length used for year differences.
const DAYS_PER_YEAR: f64 = 365.2422;

static SLASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("valid regex"));
static DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"));

/// Supported date input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateFormat {
    /// `dd/mm/YYYY`
    #[default]
    DayMonthYear,
    /// `YYYY-mm-dd`
    YearMonthDay,
    /// `mm/dd/YYYY`
    MonthDayYear,
    /// `YYYY-mm-ddTHH:MM...`, only the date part is used.
    IsoDateTime,
}

/// Day, month and year of a date string, not yet checked for calendar validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl DateParts {
    /// The calendar date, or `None` if the parts do not form a real date
    /// (e.g. 31/02/2020).
    pub fn to_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl DateFormat {
    pub const ALL: [DateFormat; 4] = [
        Self::DayMonthYear,
        Self::YearMonthDay,
        Self::MonthDayYear,
        Self::IsoDateTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayMonthYear => "dd/mm/YYYY",
            Self::YearMonthDay => "YYYY-mm-dd",
            Self::MonthDayYear => "mm/dd/YYYY",
            Self::IsoDateTime => "isoDateTime",
        }
    }

    /// Split `input` into day, month and year.
    pub fn parts(self, input: &str) -> Option<DateParts> {
        let input = input.trim();
        let (regex, input) = match self {
            Self::DayMonthYear | Self::MonthDayYear => (&*SLASHED, input),
            Self::YearMonthDay => (&*DASHED, input),
            Self::IsoDateTime => (&*DASHED, input.split('T').next().unwrap_or_default()),
        };
        let caps = regex.captures(input)?;
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
        let (a, b, c) = (num(1)?, num(2)?, num(3)?);

        let (day, month, year) = match self {
            Self::DayMonthYear => (a, b, c),
            Self::MonthDayYear => (b, a, c),
            Self::YearMonthDay | Self::IsoDateTime => (c, b, a),
        };
        Some(DateParts {
            day: u32::try_from(day).ok()?,
            month: u32::try_from(month).ok()?,
            year: i32::try_from(year).ok()?,
        })
    }

    /// Parse `input` into a calendar date.
    pub fn parse(self, input: &str) -> Option<NaiveDate> {
        self.parts(input)?.to_date()
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedDateFormat(s.to_string()))
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateFormat> for String {
    fn from(value: DateFormat) -> Self {
        value.as_str().to_string()
    }
}

/// Absolute difference between two dates in (fractional) years.
///
/// Values within a thousandth below a whole year are rounded up, so exact
/// anniversaries count as full years despite leap-day drift.
pub fn years_between(a: NaiveDate, b: NaiveDate) -> f64 {
    let days = (a - b).num_days().abs() as f64;
    let years = days / DAYS_PER_YEAR;
    if years.fract() >= 0.999 {
        years.ceil()
    } else {
        years
    }
}

/// Years from `date` to `today`, negative when `date` is in the future.
pub fn years_since(date: NaiveDate, today: NaiveDate) -> f64 {
    let years = years_between(date, today);
    if date > today { -years } else { years }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_each_format() {
        assert_eq!(DateFormat::DayMonthYear.parse("24/12/2020"), Some(ymd(2020, 12, 24)));
        assert_eq!(DateFormat::MonthDayYear.parse("12/24/2020"), Some(ymd(2020, 12, 24)));
        assert_eq!(DateFormat::YearMonthDay.parse("2020-12-24"), Some(ymd(2020, 12, 24)));
        assert_eq!(
            DateFormat::IsoDateTime.parse("2020-12-24T10:30:00Z"),
            Some(ymd(2020, 12, 24))
        );
    }

    #[test]
    fn test_parts_without_calendar_check() {
        let parts = DateFormat::DayMonthYear.parts("31/02/2020").unwrap();
        assert_eq!(parts, DateParts { day: 31, month: 2, year: 2020 });
        assert_eq!(parts.to_date(), None);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        assert_eq!(DateFormat::DayMonthYear.parse("2020-12-24"), None);
        assert_eq!(DateFormat::DayMonthYear.parse("1/2/2020"), None);
        assert_eq!(DateFormat::YearMonthDay.parse("24/12/2020"), None);
        assert_eq!(DateFormat::YearMonthDay.parse(""), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("isoDateTime".parse::<DateFormat>().unwrap(), DateFormat::IsoDateTime);
        assert!(matches!(
            "dd.mm.YYYY".parse::<DateFormat>(),
            Err(ConfigError::UnsupportedDateFormat(f)) if f == "dd.mm.YYYY"
        ));
    }

    #[test]
    fn test_years_between() {
        assert!(years_between(ymd(2000, 1, 1), ymd(2018, 1, 1)) >= 18.0);
        assert!(years_between(ymd(2000, 6, 1), ymd(2018, 1, 1)) < 18.0);
        // One day short of 18 years still rounds up to the anniversary
        assert_eq!(years_between(ymd(2000, 1, 2), ymd(2018, 1, 1)), 18.0);
        assert!(years_since(ymd(2030, 1, 1), ymd(2020, 1, 1)) < -10.0);
        assert!(years_since(ymd(2009, 1, 1), ymd(2020, 1, 1)) > 10.0);
    }
}
