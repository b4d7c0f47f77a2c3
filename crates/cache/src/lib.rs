//! Bounded, TTL-expiring in-memory cache for serialized responses.
//!
//! Entries are keyed by a [`Fingerprint`] of the logical request and hold the
//! already-serialized response bytes. Capacity is enforced with
//! least-recently-used eviction; expiry is tracked in one ordered index, one
//! slot per entry, drained lazily on access and periodically by a single sweeper task.

mod cache;
pub mod error;
mod fingerprint;

pub use crate::cache::ResponseCache;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::fingerprint::Fingerprint;
