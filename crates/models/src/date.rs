use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use exn::ResultExt;
use time::{Date, Month};

use crate::error::{Error, ErrorKind};

/// Calendar date of a package build, written as `YYYYMMDD`.
///
/// Ordering follows the calendar, which for this fixed-width format is also
/// the lexicographic ordering of the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseDate(Date);
impl ReleaseDate {
    pub fn date(&self) -> Date {
        self.0
    }

    /// Human readable form, e.g. `"1 January 2023"`.
    pub fn human(&self) -> String {
        format!("{} {} {}", self.0.day(), self.0.month(), self.0.year())
    }
}
impl FromStr for ReleaseDate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ErrorKind::parse("date", s);
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            exn::bail!(invalid());
        }
        // All eight bytes are ASCII digits, so these slices are on char boundaries and parse.
        let year = s[0..4].parse::<i32>().or_raise(invalid)?;
        let month = s[4..6].parse::<u8>().or_raise(invalid)?;
        let day = s[6..8].parse::<u8>().or_raise(invalid)?;
        if year < 1 {
            exn::bail!(invalid());
        }
        let month = Month::try_from(month).or_raise(invalid)?;
        let date = Date::from_calendar_date(year, month, day).or_raise(invalid)?;
        Ok(Self(date))
    }
}
impl From<Date> for ReleaseDate {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

impl Display for ReleaseDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:04}{:02}{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("20230101", "1 January 2023")]
    #[case("20191231", "31 December 2019")]
    #[case("20200229", "29 February 2020")]
    fn test_parse_and_humanize(#[case] input: &str, #[case] human: &str) {
        let date: ReleaseDate = input.parse().unwrap();
        assert_eq!(date.to_string(), input);
        assert_eq!(date.human(), human);
    }

    #[rstest]
    #[case("")]
    #[case("2023011")]
    #[case("202301011")]
    #[case("2023-01-01")]
    #[case("20231301")]
    #[case("20230230")]
    #[case("00000101")]
    #[case("2023O101")]
    fn test_parse_invalid(#[case] input: &str) {
        let err = input.parse::<ReleaseDate>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { field: "date", .. }));
    }

    #[test]
    fn test_ordering_matches_string_ordering() {
        let older: ReleaseDate = "20191231".parse().unwrap();
        let newer: ReleaseDate = "20200101".parse().unwrap();
        assert!(older < newer);
        assert!(older.to_string() < newer.to_string());
    }
}
