//! # Release Lookup
//!
//! Reads the latest published release of the configured repository and
//! decides whether it is newer than the running build.
//!
//! ```text
//! ┌─────────────┬────────────────────────────────────────────────────────┐
//! │ Response    │ Outcome                                                │
//! ├─────────────┼────────────────────────────────────────────────────────┤
//! │ 200         │ Release parsed                                         │
//! │ 404         │ NoRelease (repository has no published release)        │
//! │ 403 + quota │ RateLimited                                            │
//! │ 429 / 5xx   │ retried with exponential backoff                       │
//! │ timeout     │ retried with exponential backoff                       │
//! └─────────────┴────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::UpdateConfig;
use crate::download::Downloader;
use crate::error::{UpdateError, UpdateResult};
use pdv_core::Version;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
}

/// The subset of the GitHub release JSON the updater needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes (markdown).
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    pub fn version(&self) -> UpdateResult<Version> {
        Ok(Version::parse(&self.tag_name)?)
    }

    /// Asset with this exact name, ignoring ASCII case.
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    UpToDate {
        current: Version,
        latest: Version,
    },
    Available {
        current: Version,
        version: Version,
        name: Option<String>,
        notes: Option<String>,
        asset: Asset,
    },
}

impl UpdateStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, UpdateStatus::Available { .. })
    }
}

/// Compares a release with the running version.
///
/// A newer release must carry `asset_name`; an older or equal one never
/// needs it.
pub fn evaluate(current: &Version, release: &Release, asset_name: &str) -> UpdateResult<UpdateStatus> {
    let version = release.version()?;
    if !version.is_newer_than(current) {
        return Ok(UpdateStatus::UpToDate {
            current: current.clone(),
            latest: version,
        });
    }

    let asset = release
        .asset(asset_name)
        .cloned()
        .ok_or_else(|| UpdateError::AssetMissing {
            tag: release.tag_name.clone(),
            asset: asset_name.to_string(),
        })?;

    Ok(UpdateStatus::Available {
        current: current.clone(),
        version,
        name: release.name.clone(),
        notes: release.body.clone(),
        asset,
    })
}

#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: Client,
    config: UpdateConfig,
}

impl ReleaseClient {
    pub fn new(config: UpdateConfig) -> UpdateResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(ReleaseClient { http, config })
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Latest published release, retrying transient failures.
    pub async fn latest(&self) -> UpdateResult<Release> {
        let url = self.config.latest_release_url()?;
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            multiplier: 2.0,
            max_elapsed_time: Some(self.config.max_retry_time),
            ..Default::default()
        };

        retry(policy, || async {
            self.fetch_latest(&url).await.map_err(|e| {
                if e.is_transient() {
                    warn!(error = %e, "Release lookup failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    async fn fetch_latest(&self, url: &Url) -> UpdateResult<Release> {
        debug!(url = %url, "Fetching latest release");
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Release>().await?);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(UpdateError::NoRelease);
        }
        let quota_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        if status == StatusCode::FORBIDDEN && quota_exhausted {
            return Err(UpdateError::RateLimited);
        }
        Err(UpdateError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }

    /// Looks up the latest release and compares it with the running version.
    pub async fn check_for_update(&self) -> UpdateResult<UpdateStatus> {
        let release = self.latest().await?;
        let status = evaluate(&self.config.current_version, &release, &self.config.asset_name)?;
        match &status {
            UpdateStatus::Available { version, .. } => {
                info!(current = %self.config.current_version, latest = %version, "Update available")
            }
            UpdateStatus::UpToDate { latest, .. } => {
                debug!(latest = %latest, "Already up to date")
            }
        }
        Ok(status)
    }

    /// Downloader sharing this client's connection pool.
    pub fn downloader(&self, dest: impl Into<PathBuf>) -> Downloader {
        Downloader::new(self.http.clone(), dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use std::sync::atomic::Ordering;

    const FIXTURE: &str = r#"{
        "tag_name": "v1.3.0",
        "name": "Balcão PDV 1.3.0",
        "body": "- Cupom em 58mm\n- Correções",
        "prerelease": false,
        "published_at": "2024-05-02T12:00:00Z",
        "html_url": "https://github.com/balcao-pdv/balcao-pdv/releases/tag/v1.3.0",
        "assets": [
            {"name": "pdv.exe", "size": 7340032, "browser_download_url": "https://example.com/pdv.exe", "content_type": "application/octet-stream"},
            {"name": "pdv", "size": 6291456, "browser_download_url": "https://example.com/pdv"}
        ]
    }"#;

    fn release() -> Release {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_parse_fixture() {
        let r = release();
        assert_eq!(r.version().unwrap(), Version::new(1, 3, 0));
        assert_eq!(r.asset("PDV.EXE").unwrap().size, 7_340_032);
        assert!(r.asset("pdv.zip").is_none());
    }

    #[test]
    fn test_evaluate() {
        let r = release();

        let status = evaluate(&Version::new(1, 2, 9), &r, "pdv.exe").unwrap();
        assert!(status.is_available());

        let status = evaluate(&Version::new(1, 3, 0), &r, "pdv.exe").unwrap();
        assert!(!status.is_available());

        // Missing asset only matters when an update exists
        assert!(evaluate(&Version::new(1, 3, 0), &r, "pdv.zip").is_ok());
        assert!(matches!(
            evaluate(&Version::new(1, 0, 0), &r, "pdv.zip"),
            Err(UpdateError::AssetMissing { .. })
        ));
    }

    fn client(base: &str) -> ReleaseClient {
        client_retrying_for(base, Duration::from_millis(200))
    }

    fn client_retrying_for(base: &str, max_retry_time: Duration) -> ReleaseClient {
        let mut cfg = UpdateConfig::new("loja", "pdv", Version::new(1, 0, 0))
            .with_api_base(base)
            .with_asset("pdv");
        cfg.max_retry_time = max_retry_time;
        ReleaseClient::new(cfg).unwrap()
    }

    #[tokio::test]
    async fn test_check_against_local_server() {
        let base = test_server::serve(vec![test_server::Route::ok(
            "/repos/loja/pdv/releases/latest",
            FIXTURE.as_bytes().to_vec(),
        )])
        .await;

        let status = client(&base).check_for_update().await.unwrap();
        match status {
            UpdateStatus::Available { version, asset, .. } => {
                assert_eq!(version, Version::new(1, 3, 0));
                assert_eq!(asset.name, "pdv");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_release_is_not_retried() {
        let (base, hits) = test_server::serve_counted(vec![]).await;
        assert!(matches!(
            client_retrying_for(&base, Duration::from_secs(10)).latest().await,
            Err(UpdateError::NoRelease)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_is_retried() {
        let (base, hits) = test_server::serve_counted(vec![test_server::Route::ok(
            "/repos/loja/pdv/releases/latest",
            FIXTURE.as_bytes().to_vec(),
        )
        .failing_first(&[503])])
        .await;

        let release = client_retrying_for(&base, Duration::from_secs(10))
            .latest()
            .await
            .unwrap();
        assert_eq!(release.tag_name, "v1.3.0");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
