//! Release source backed by an HTTP endpoint serving `LATEST.json`.

use crate::error::{ErrorKind, Result};
use crate::source::ReleaseSource;
use async_trait::async_trait;
use exn::ResultExt;
use pkgapi_models::{Platform, ReleaseManifest};
use std::time::Duration;
use tracing::instrument;

/// Upstream location of the per-platform manifest; `{arch}` is replaced by the platform.
pub const DEFAULT_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/opengapps/{arch}/master/LATEST.json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url_template: String,
    token: Option<String>,
}

impl HttpSource {
    /// Build a source fetching from `url_template`, sending `token` as a bearer token when set.
    pub fn new(url_template: impl Into<String>, timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        let token = token.filter(|token| !token.is_empty());
        Ok(Self { client, url_template: url_template.into(), token })
    }

    pub fn url(&self, platform: Platform) -> String {
        self.url_template.replace("{arch}", platform.as_str())
    }
}

#[async_trait]
impl ReleaseSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(level = "debug", skip(self), fields(url = %self.url(platform)))]
    async fn latest(&self, platform: Platform) -> Result<ReleaseManifest> {
        let mut request = self.client.get(self.url(platform));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.or_raise(|| ErrorKind::Fetch(platform))?;
        let status = response.status();
        // Only a plain 200 carries a manifest.
        if status != reqwest::StatusCode::OK {
            exn::bail!(ErrorKind::Status { platform, status: status.as_u16() });
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Fetch(platform))?;
        // Malformed JSON is a fetch failure; identifier validation happens later.
        ReleaseManifest::from_slice(&body).or_raise(|| ErrorKind::Fetch(platform))
    }
}
