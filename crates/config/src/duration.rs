//! Human-readable durations: `"250ms"`, `"1s"`, `"5m"`, `"1h"`.
//!
//! Bare integers are read as seconds when they come from a typed source
//! (TOML integers, numeric environment variables).

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

use crate::error::{ErrorKind, Result};

const UNITS: [(&str, u64); 4] = [("h", 3_600_000), ("m", 60_000), ("s", 1_000), ("ms", 1)];

pub fn parse(s: &str) -> Result<Duration> {
    let trimmed = s.trim();
    let split = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split);
    let Ok(amount) = amount.parse::<u64>() else {
        exn::bail!(ErrorKind::Duration(s.to_string()));
    };
    let Some((_, millis)) = UNITS.iter().find(|(name, _)| *name == unit.trim()) else {
        exn::bail!(ErrorKind::Duration(s.to_string()));
    };
    match amount.checked_mul(*millis) {
        Some(total) => Ok(Duration::from_millis(total)),
        None => exn::bail!(ErrorKind::Duration(s.to_string())),
    }
}

/// Format using the largest unit that represents `duration` exactly.
pub fn format(duration: Duration) -> String {
    let millis = duration.as_millis();
    for (name, size) in UNITS {
        let size = u128::from(size);
        if millis % size == 0 && (millis > 0 || size == 1) {
            return format!("{}{name}", millis / size);
        }
    }
    format!("{millis}ms")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Seconds(u64),
    Text(String),
}

pub(crate) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(*duration))
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    match Raw::deserialize(deserializer)? {
        Raw::Seconds(seconds) => Ok(Duration::from_secs(seconds)),
        Raw::Text(text) => parse(&text).map_err(|err| serde::de::Error::custom(&*err)),
    }
}
