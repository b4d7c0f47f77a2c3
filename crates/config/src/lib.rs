//! Configuration loading and validation.
//!
//! Values are layered, later layers winning:
//! 1. built-in defaults,
//! 2. a TOML file (explicit path, or the platform config directory),
//! 3. environment variables prefixed `PKGAPI_`, with `__` separating
//!    nested keys (`PKGAPI_CACHE__TTL=30s`).

pub mod duration;
pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::error::{Error, ErrorKind, Result};

/// Upstream manifest location; `{arch}` is replaced by the platform.
pub const DEFAULT_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/opengapps/{arch}/master/LATEST.json";
const ENV_PREFIX: &str = "PKGAPI_";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Bound on opening and closing the store.
    #[serde(with = "duration")]
    pub timeout: Duration,
}
impl Default for DbConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("pkgapi.db"), timeout: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    pub limit: usize,
    #[serde(with = "duration")]
    pub ttl: Duration,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { limit: 16, ttl: Duration::from_secs(5 * 60) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url_template: String,
    /// Bearer token for the upstream, if it rate-limits anonymous requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(with = "duration")]
    pub timeout: Duration,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self { url_template: DEFAULT_URL_TEMPLATE.to_string(), token: None, timeout: Duration::from_secs(10) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(with = "duration")]
    pub interval: Duration,
}
impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Default configuration file location for this platform, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pkgapi").map(|dirs| dirs.config_dir().join(FILE_NAME))
    }

    /// Layered provider: defaults, then the TOML file at `file` (if any), then the environment.
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file {
            Some(file) => figment.merge(Toml::file(file)),
            None => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration.
    ///
    /// An explicit `file` must exist. Without one, the platform default
    /// location is used when present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(file) if !file.exists() => exn::bail!(ErrorKind::Missing(file.to_path_buf())),
            Some(file) => Some(file.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        };
        match &file {
            Some(file) => tracing::debug!(file = %file.display(), "loading configuration"),
            None => tracing::debug!("no configuration file; using defaults and environment"),
        }
        Self::from_figment(Self::figment(file.as_deref()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.db.timeout.is_zero(), "db.timeout"),
            (self.cache.limit == 0, "cache.limit"),
            (self.cache.ttl.is_zero(), "cache.ttl"),
            (self.source.timeout.is_zero(), "source.timeout"),
            (!self.source.url_template.contains("{arch}"), "source.url_template"),
            (self.watch.interval.is_zero(), "watch.interval"),
        ];
        if let Some((_, field)) = checks.into_iter().find(|(invalid, _)| *invalid) {
            exn::bail!(ErrorKind::Invalid(field));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::from_figment(Config::figment(None)).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.db.path, PathBuf::from("pkgapi.db"));
            assert_eq!(config.db.timeout, Duration::from_secs(1));
            assert_eq!(config.cache.limit, 16);
            assert_eq!(config.watch.interval, Duration::from_secs(60));
            assert!(config.source.token.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pkgapi.toml",
                r#"
                    [db]
                    path = "/var/lib/pkgapi/releases.db"

                    [cache]
                    limit = 4
                    ttl = "30s"

                    [watch]
                    interval = "5m"
                "#,
            )?;
            jail.set_env("PKGAPI_CACHE__TTL", "45s");
            jail.set_env("PKGAPI_SOURCE__TOKEN", "secret");
            let config = Config::load(Some(Path::new("pkgapi.toml"))).unwrap();
            assert_eq!(config.db.path, PathBuf::from("/var/lib/pkgapi/releases.db"));
            assert_eq!(config.db.timeout, Duration::from_secs(1));
            assert_eq!(config.cache.limit, 4);
            assert_eq!(config.cache.ttl, Duration::from_secs(45));
            assert_eq!(config.watch.interval, Duration::from_secs(300));
            assert_eq!(config.source.token.as_deref(), Some("secret"));
            Ok(())
        });
    }

    #[test]
    fn test_integer_duration_is_seconds() {
        Jail::expect_with(|jail| {
            jail.set_env("PKGAPI_WATCH__INTERVAL", "90");
            let config = Config::from_figment(Config::figment(None)).unwrap();
            assert_eq!(config.watch.interval, Duration::from_secs(90));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Missing(PathBuf::from("nope.toml")));
            Ok(())
        });
    }

    #[test]
    fn test_malformed_duration() {
        Jail::expect_with(|jail| {
            jail.set_env("PKGAPI_CACHE__TTL", "soon");
            let err = Config::from_figment(Config::figment(None)).unwrap_err();
            assert_eq!(*err, ErrorKind::Load);
            Ok(())
        });
    }

    #[rstest]
    #[case("PKGAPI_CACHE__LIMIT", "0", "cache.limit")]
    #[case("PKGAPI_CACHE__TTL", "0s", "cache.ttl")]
    #[case("PKGAPI_WATCH__INTERVAL", "0ms", "watch.interval")]
    #[case("PKGAPI_DB__TIMEOUT", "0s", "db.timeout")]
    #[case("PKGAPI_SOURCE__URL_TEMPLATE", "https://example.com/latest.json", "source.url_template")]
    fn test_validation(#[case] var: &str, #[case] value: &str, #[case] field: &'static str) {
        Jail::expect_with(|jail| {
            jail.set_env(var, value);
            let err = Config::from_figment(Config::figment(None)).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid(field));
            Ok(())
        });
    }
}
