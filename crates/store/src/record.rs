//! Key encoding and the persisted record format.

use exn::{OptionExt, ResultExt};
use pkgapi_models::{ArchRecord, Platform, ReleaseDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::{Error, ErrorKind, Result};

/// Key of one (date, platform) release: `"<YYYYMMDD>-<platform>"`.
///
/// Dates are fixed-width and zero-padded, so keys sharing a platform sort
/// lexicographically in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub date: ReleaseDate,
    pub platform: Platform,
}
impl StoreKey {
    pub fn new(date: ReleaseDate, platform: Platform) -> Self {
        Self { date, platform }
    }

    /// Prefix matching every key for `date`, or the single key when a platform is given.
    pub fn prefix(date: ReleaseDate, platform: Option<Platform>) -> String {
        match platform {
            Some(platform) => Self::new(date, platform).to_string(),
            None => format!("{date}-"),
        }
    }
}
impl FromStr for StoreKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ErrorKind::InvalidData(format!("key '{s}'"));
        let (date, platform) = s.split_once('-').ok_or_raise(invalid)?;
        let date = date.parse::<ReleaseDate>().or_raise(invalid)?;
        let platform = platform.parse::<Platform>().or_raise(invalid)?;
        Ok(Self { date, platform })
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}", self.date, self.platform)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Persisted release: the platform's package tree plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: ArchRecord,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Unix timestamp of the first ingestion.
    pub ts: i64,
}
impl StoredRecord {
    pub fn new(record: ArchRecord) -> Self {
        Self { record, disabled: false, ts: OffsetDateTime::now_utc().unix_timestamp() }
    }

    pub fn ingested_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.ts).ok()
    }

    pub fn from_slice(key: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::InvalidData(format!("record '{key}'")))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).or_raise(|| ErrorKind::InvalidData(format!("record '{}'", self.record.date)))
    }
}
