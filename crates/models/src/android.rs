use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// Android API release a package targets.
///
/// Parses both the compact (`"71"`) and the dotted (`"7.1"`) spelling, and
/// always displays the dotted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Android {
    KitKat,
    Lollipop,
    LollipopMr1,
    Marshmallow,
    Nougat,
    NougatMr1,
    Oreo,
    OreoMr1,
    Pie,
    Q,
    R,
}
impl Android {
    pub const ALL: [Android; 11] = [
        Android::KitKat,
        Android::Lollipop,
        Android::LollipopMr1,
        Android::Marshmallow,
        Android::Nougat,
        Android::NougatMr1,
        Android::Oreo,
        Android::OreoMr1,
        Android::Pie,
        Android::Q,
        Android::R,
    ];

    /// Dotted version string, e.g. `"7.1"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Android::KitKat => "4.4",
            Android::Lollipop => "5.0",
            Android::LollipopMr1 => "5.1",
            Android::Marshmallow => "6.0",
            Android::Nougat => "7.0",
            Android::NougatMr1 => "7.1",
            Android::Oreo => "8.0",
            Android::OreoMr1 => "8.1",
            Android::Pie => "9.0",
            Android::Q => "10.0",
            Android::R => "11.0",
        }
    }

    /// Compact version string used in file names, e.g. `"71"`.
    pub fn as_compact_str(&self) -> &'static str {
        match self {
            Android::KitKat => "44",
            Android::Lollipop => "50",
            Android::LollipopMr1 => "51",
            Android::Marshmallow => "60",
            Android::Nougat => "70",
            Android::NougatMr1 => "71",
            Android::Oreo => "80",
            Android::OreoMr1 => "81",
            Android::Pie => "90",
            Android::Q => "100",
            Android::R => "110",
        }
    }
}
impl FromStr for Android {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.replace('.', "").as_str() {
            "44" => Self::KitKat,
            "50" => Self::Lollipop,
            "51" => Self::LollipopMr1,
            "60" => Self::Marshmallow,
            "70" => Self::Nougat,
            "71" => Self::NougatMr1,
            "80" => Self::Oreo,
            "81" => Self::OreoMr1,
            "90" => Self::Pie,
            "100" => Self::Q,
            "110" => Self::R,
            _ => exn::bail!(ErrorKind::parse("api", s)),
        })
    }
}

impl Display for Android {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("7.1", Android::NougatMr1)]
    #[case("71", Android::NougatMr1)]
    #[case("4.4", Android::KitKat)]
    #[case("10.0", Android::Q)]
    #[case("100", Android::Q)]
    #[case("110", Android::R)]
    fn test_parse_either_spelling(#[case] input: &str, #[case] expected: Android) {
        assert_eq!(input.parse::<Android>().unwrap(), expected);
    }

    #[rstest]
    #[case("7.2")]
    #[case("12.0")]
    #[case("")]
    #[case("nougat")]
    fn test_parse_unknown(#[case] input: &str) {
        let err = input.parse::<Android>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { field: "api", .. }));
    }

    #[test]
    fn test_dotted_round_trip() {
        for api in Android::ALL {
            assert_eq!(api.to_string().parse::<Android>().unwrap(), api);
            assert_eq!(api.as_compact_str(), api.as_str().replace('.', ""));
        }
    }
}
