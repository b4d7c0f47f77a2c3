use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{Android, Platform, ReleaseDate, Variant};

const DOWNLOAD_BASE: &str = "https://downloads.sourceforge.net/project/opengapps";
const MIRRORS_BASE: &str = "https://sourceforge.net/settings/mirror_choices?projectname=opengapps&filename=";

/// One downloadable artifact belonging to a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkField {
    Zip,
    ZipMirrors,
    Md5,
    VersionInfo,
    SourceReport,
}
impl LinkField {
    pub const ALL: [LinkField; 5] =
        [LinkField::Zip, LinkField::ZipMirrors, LinkField::Md5, LinkField::VersionInfo, LinkField::SourceReport];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkField::Zip => "ZIP",
            LinkField::ZipMirrors => "ZIPMirrors",
            LinkField::Md5 => "MD5",
            LinkField::VersionInfo => "VersionInfo",
            LinkField::SourceReport => "SourceReport",
        }
    }
}

impl Display for LinkField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Fully identified package build; everything needed to derive its links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Package {
    pub date: ReleaseDate,
    pub platform: Platform,
    pub api: Android,
    pub variant: Variant,
}
impl Package {
    pub fn new(date: ReleaseDate, platform: Platform, api: Android, variant: Variant) -> Self {
        Self { date, platform, api, variant }
    }

    /// Base file name shared by the zip, checksum and version log.
    pub fn file_stem(&self) -> String {
        format!("open_gapps-{}-{}-{}-{}", self.platform, self.api, self.variant, self.date)
    }

    pub fn file_name(&self, field: LinkField) -> String {
        match field {
            LinkField::Zip | LinkField::ZipMirrors => format!("{}.zip", self.file_stem()),
            LinkField::Md5 => format!("{}.zip.md5", self.file_stem()),
            LinkField::VersionInfo => format!("{}.versionlog.txt", self.file_stem()),
            LinkField::SourceReport => format!("sources_report-{}-{}-{}.txt", self.platform, self.api, self.date),
        }
    }

    pub fn link(&self, field: LinkField) -> String {
        let file = self.file_name(field);
        match field {
            LinkField::ZipMirrors => format!("{MIRRORS_BASE}{}/{}/{file}", self.platform, self.date),
            _ => format!("{DOWNLOAD_BASE}/{}/{}/{file}", self.platform, self.date),
        }
    }
}
