use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};

/// CPU architecture a package is built for.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    Arm,
    Arm64,
    X86,
    X86_64,
}
impl Platform {
    /// Every supported platform, in watch order.
    pub const ALL: [Platform; 4] = [Platform::Arm, Platform::Arm64, Platform::X86, Platform::X86_64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Arm => "arm",
            Platform::Arm64 => "arm64",
            Platform::X86 => "x86",
            Platform::X86_64 => "x86_64",
        }
    }
}
impl FromStr for Platform {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "arm" => Self::Arm,
            "arm64" => Self::Arm64,
            "x86" => Self::X86,
            "x86_64" => Self::X86_64,
            _ => exn::bail!(ErrorKind::parse("platform", s)),
        })
    }
}
impl TryFrom<String> for Platform {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
