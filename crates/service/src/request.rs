//! Request and response bodies, and their validation.

use exn::ResultExt;
use pkgapi_models::{Android, LinkField, Package, Platform, ReleaseDate, Variant};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::{Error, ErrorKind, Result};

/// Appended to every direct download link so SourceForge picks a mirror.
const MIRROR_SUFFIX: &str = "?r=&ts={ts}&use_mirror=autoselect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Enable,
    Disable,
}
impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Disable => "disable",
        }
    }

    pub fn disables(&self) -> bool {
        matches!(self, Action::Disable)
    }
}
impl FromStr for Action {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            _ => exn::bail!(ErrorKind::validation("bad action value")),
        })
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Enable/disable request body: `{ "action", "date", "platform"? }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequest {
    pub action: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// A [`PackageRequest`] that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageChange {
    pub action: Action,
    pub date: ReleaseDate,
    pub platform: Option<Platform>,
}

impl PackageRequest {
    pub fn new(action: Action, date: impl Into<String>, platform: Option<Platform>) -> Self {
        Self { action: action.to_string(), date: date.into(), platform: platform.map(|p| p.to_string()) }
    }

    pub fn validate(&self) -> Result<PackageChange> {
        let action: Action = self.action.parse()?;
        let date = self.date.parse::<ReleaseDate>().or_raise(|| ErrorKind::validation("bad date format"))?;
        let platform = match self.platform.as_deref() {
            None | Some("") => None,
            Some(platform) => {
                Some(platform.parse::<Platform>().or_raise(|| ErrorKind::validation("bad platform value"))?)
            },
        };
        Ok(PackageChange { action, date, platform })
    }
}

/// Download-link query parameters; all four are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DownloadQuery {
    pub arch: Option<String>,
    pub api: Option<String>,
    pub variant: Option<String>,
    pub date: Option<String>,
}

fn required<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => exn::bail!(ErrorKind::validation(format!("'{name}' param is empty or missing"))),
    }
}

impl DownloadQuery {
    pub fn new(arch: &str, api: &str, variant: &str, date: &str) -> Self {
        Self {
            arch: Some(arch.to_string()),
            api: Some(api.to_string()),
            variant: Some(variant.to_string()),
            date: Some(date.to_string()),
        }
    }

    pub fn validate(&self) -> Result<Package> {
        let arch = required("arch", &self.arch)?;
        let api = required("api", &self.api)?.replace('.', "");
        let variant = required("variant", &self.variant)?;
        let date = required("date", &self.date)?;

        let platform =
            arch.parse::<Platform>().or_raise(|| ErrorKind::validation(format!("bad arch value '{arch}'")))?;
        let api = api.parse::<Android>().or_raise(|| ErrorKind::validation(format!("bad api value '{api}'")))?;
        let variant =
            variant.parse::<Variant>().or_raise(|| ErrorKind::validation(format!("bad variant value '{variant}'")))?;
        let date =
            date.parse::<ReleaseDate>().or_raise(|| ErrorKind::validation(format!("bad date value '{date}'")))?;
        Ok(Package::new(date, platform, api, variant))
    }

    /// Validate and build the links, stamped with the current time.
    pub fn links(&self) -> Result<DownloadResponse> {
        let package = self.validate()?;
        Ok(DownloadResponse::new(&package, OffsetDateTime::now_utc().unix_timestamp()))
    }
}

/// Every link for one package. Direct links carry a mirror-selection suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub zip: String,
    pub zip_mirrors: String,
    pub md5: String,
    pub version_info: String,
    pub source_report: String,
}
impl DownloadResponse {
    /// Links for `package`, stamped with the unix timestamp `ts`.
    pub fn new(package: &Package, ts: i64) -> Self {
        let suffix = MIRROR_SUFFIX.replace("{ts}", &ts.to_string());
        let direct = |field: LinkField| format!("{}{suffix}", package.link(field));
        Self {
            zip: direct(LinkField::Zip),
            zip_mirrors: package.link(LinkField::ZipMirrors),
            md5: direct(LinkField::Md5),
            version_info: direct(LinkField::VersionInfo),
            source_report: direct(LinkField::SourceReport),
        }
    }
}
