use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use exn::ResultExt;
use serde::{Deserialize, Serialize};

use crate::{
    LinkField, Package, Platform, ReleaseDate,
    error::{ErrorKind, Result},
};

/// One variant of one API level, with every derived download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVariant {
    pub name: String,
    pub zip: String,
    pub zip_mirrors: String,
    pub md5: String,
    pub version_info: String,
    pub source_report: String,
}
impl From<&Package> for ApiVariant {
    fn from(package: &Package) -> Self {
        Self {
            name: package.variant.to_string(),
            zip: package.link(LinkField::Zip),
            zip_mirrors: package.link(LinkField::ZipMirrors),
            md5: package.link(LinkField::Md5),
            version_info: package.link(LinkField::VersionInfo),
            source_report: package.link(LinkField::SourceReport),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRecord {
    #[serde(default)]
    pub variants: Vec<ApiVariant>,
}

/// Everything published for a single platform on a single date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchRecord {
    #[serde(default)]
    pub apis: BTreeMap<String, ApiRecord>,
    pub date: String,
    #[serde(default)]
    pub human_date: String,
}
impl ArchRecord {
    pub fn new(date: ReleaseDate) -> Self {
        Self { apis: BTreeMap::new(), date: date.to_string(), human_date: date.human() }
    }

    pub fn release_date(&self) -> Result<ReleaseDate> {
        self.date.parse()
    }

    pub fn variant_count(&self) -> usize {
        self.apis.values().map(|api| api.variants.len()).sum()
    }
}

#[derive(Serialize)]
struct ListBody {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    archs: BTreeMap<&'static str, ArchRecord>,
}

/// Per-platform package tree, filled concurrently by one producer per platform.
#[derive(Debug, Default)]
pub struct ListResponse {
    archs: Mutex<BTreeMap<Platform, ArchRecord>>,
}
impl ListResponse {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Platform, ArchRecord>> {
        self.archs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds one package to its platform's record.
    ///
    /// The first date seen for a platform wins; packages for any other date
    /// are dropped and `false` is returned.
    pub fn add_package(&self, package: &Package) -> bool {
        let mut archs = self.lock();
        let date = package.date.to_string();
        let record = archs.entry(package.platform).or_insert_with(|| ArchRecord::new(package.date));
        if record.date != date {
            tracing::debug!(
                platform = %package.platform,
                kept = %record.date,
                dropped = %date,
                "ignoring package for a second release date"
            );
            return false;
        }
        let variants = &mut record.apis.entry(package.api.to_string()).or_default().variants;
        let name = package.variant.as_str();
        if !variants.iter().any(|v| v.name == name) {
            variants.push(ApiVariant::from(package));
        }
        true
    }

    /// Places an already-built record, replacing whatever the platform had.
    pub fn insert(&self, platform: Platform, record: ArchRecord) {
        self.lock().insert(platform, record);
    }

    pub fn get(&self, platform: Platform) -> Option<ArchRecord> {
        self.lock().get(&platform).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<Platform, ArchRecord> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let archs = self.snapshot().into_iter().map(|(platform, record)| (platform.as_str(), record)).collect();
        serde_json::to_vec(&ListBody { archs }).or_raise(|| ErrorKind::Serialize)
    }
}
