//! Release identifiers, manifests and the aggregated package listing.
//!
//! A [`ReleaseManifest`] fetched for one [`Platform`] expands into
//! [`Package`]s, which are collected into a [`ListResponse`]: one
//! [`ArchRecord`] per platform holding API levels, variants and their
//! download links.

mod android;
mod date;
pub mod error;
mod link;
mod list;
mod manifest;
mod platform;
mod variant;

pub use self::android::Android;
pub use self::date::ReleaseDate;
pub use self::error::{Error, ErrorKind, Result};
pub use self::link::{LinkField, Package};
pub use self::list::{ApiRecord, ApiVariant, ArchRecord, ListResponse};
pub use self::manifest::{ReleaseAsset, ReleaseManifest};
pub use self::platform::Platform;
pub use self::variant::Variant;
