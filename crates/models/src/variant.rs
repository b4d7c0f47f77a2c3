use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// Package flavour, from the smallest install to the largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    TvStock,
    Pico,
    Nano,
    Micro,
    Mini,
    Full,
    Stock,
    Super,
    Aroma,
    TvMini,
}
impl Variant {
    pub const ALL: [Variant; 10] = [
        Variant::TvStock,
        Variant::Pico,
        Variant::Nano,
        Variant::Micro,
        Variant::Mini,
        Variant::Full,
        Variant::Stock,
        Variant::Super,
        Variant::Aroma,
        Variant::TvMini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::TvStock => "tvstock",
            Variant::Pico => "pico",
            Variant::Nano => "nano",
            Variant::Micro => "micro",
            Variant::Mini => "mini",
            Variant::Full => "full",
            Variant::Stock => "stock",
            Variant::Super => "super",
            Variant::Aroma => "aroma",
            Variant::TvMini => "tvmini",
        }
    }
}
impl FromStr for Variant {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tvstock" => Self::TvStock,
            "pico" => Self::Pico,
            "nano" => Self::Nano,
            "micro" => Self::Micro,
            "mini" => Self::Mini,
            "full" => Self::Full,
            "stock" => Self::Stock,
            "super" => Self::Super,
            "aroma" => Self::Aroma,
            "tvmini" => Self::TvMini,
            _ => exn::bail!(ErrorKind::parse("variant", s)),
        })
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_round_trip_all() {
        for variant in Variant::ALL {
            assert_eq!(variant.as_str().parse::<Variant>().unwrap(), variant);
        }
    }

    #[rstest]
    #[case("Pico")]
    #[case("gigantic")]
    #[case("tv-mini")]
    fn test_parse_unknown(#[case] input: &str) {
        let err = input.parse::<Variant>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { field: "variant", .. }));
    }
}
