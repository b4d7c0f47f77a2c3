use serde::{Deserialize, Serialize};

use crate::{
    Android, ListResponse, Package, Platform, ReleaseDate, Variant,
    error::{ErrorKind, Result},
};

/// Latest release published for one platform, as served by the release source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub arch: String,
    pub date: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub api: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

impl ReleaseManifest {
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn release_date(&self) -> Result<ReleaseDate> {
        self.date.parse()
    }

    /// Validates every identifier and expands the manifest into packages.
    ///
    /// Nothing is returned unless the whole manifest is valid.
    pub fn packages(&self, platform: Platform) -> Result<Vec<Package>> {
        if !self.arch.is_empty() && self.arch != platform.as_str() {
            exn::bail!(ErrorKind::parse("arch", &self.arch));
        }
        let date = self.release_date()?;
        let mut packages = Vec::new();
        for asset in &self.assets {
            let api: Android = asset.api.parse()?;
            for variant in &asset.variants {
                let variant: Variant = variant.parse()?;
                packages.push(Package::new(date, platform, api, variant));
            }
        }
        Ok(packages)
    }

    /// Adds every package in the manifest to `list`, all or nothing.
    pub fn aggregate_into(&self, platform: Platform, list: &ListResponse) -> Result<usize> {
        let packages = self.packages(platform)?;
        Ok(packages.iter().filter(|package| list.add_package(package)).count())
    }
}
