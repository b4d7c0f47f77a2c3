//! Embedded key-value store for ingested releases.
//!
//! One SQLite table acts as a single ordered namespace of
//! `"<YYYYMMDD>-<platform>"` keys holding JSON [`StoredRecord`]s. On top of
//! the raw key-value operations sit the poller's insertion rule
//! ([`Store::ingest`]), latest-enabled resolution ([`Store::latest_enabled`]),
//! the enable/disable mutation ([`Store::set_disabled`]) and a history scan.

mod db;
pub mod error;
mod mutate;
mod record;
mod resolve;

pub use crate::db::Store;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::record::{StoreKey, StoredRecord};
