//! Where releases come from and which file to fetch.

use std::time::Duration;

use url::Url;

use crate::error::{UpdateError, UpdateResult};
use pdv_core::Version;

pub const GITHUB_API: &str = "https://api.github.com";

/// Release asset for the running platform.
pub const fn default_asset_name() -> &'static str {
    if cfg!(windows) {
        "pdv.exe"
    } else {
        "pdv"
    }
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub owner: String,
    pub repo: String,
    /// File name of the release asset holding the executable.
    pub asset_name: String,
    /// API root; overridden in tests and for GitHub Enterprise.
    pub api_base: String,
    pub current_version: Version,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Total time spent retrying a failed release lookup.
    pub max_retry_time: Duration,
}

impl UpdateConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, current_version: Version) -> Self {
        UpdateConfig {
            owner: owner.into(),
            repo: repo.into(),
            asset_name: default_asset_name().to_string(),
            api_base: GITHUB_API.to_string(),
            user_agent: format!("balcao-pdv/{}", current_version),
            current_version,
            request_timeout: Duration::from_secs(15),
            max_retry_time: Duration::from_secs(30),
        }
    }

    pub fn with_asset(mut self, asset_name: impl Into<String>) -> Self {
        self.asset_name = asset_name.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Parses `owner/repo`.
    pub fn parse_repo(slug: &str) -> UpdateResult<(String, String)> {
        match slug.trim().split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok((owner.to_string(), repo.to_string()))
            }
            _ => Err(UpdateError::Config(format!(
                "repositório deve ser dono/projeto, recebido '{}'",
                slug
            ))),
        }
    }

    /// `{api_base}/repos/{owner}/{repo}/releases/latest`
    pub fn latest_release_url(&self) -> UpdateResult<Url> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(UpdateError::Config("dono e projeto são obrigatórios".to_string()));
        }
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| UpdateError::Config(format!("api_base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| UpdateError::Config("api_base não pode ser usada como base".to_string()))?
            .pop_if_empty()
            .extend(["repos", &self.owner, &self.repo, "releases", "latest"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_url() {
        let cfg = UpdateConfig::new("balcao-pdv", "balcao-pdv", Version::new(1, 0, 0));
        assert_eq!(
            cfg.latest_release_url().unwrap().as_str(),
            "https://api.github.com/repos/balcao-pdv/balcao-pdv/releases/latest"
        );

        let cfg = cfg.with_api_base("http://127.0.0.1:8080/");
        assert_eq!(
            cfg.latest_release_url().unwrap().as_str(),
            "http://127.0.0.1:8080/repos/balcao-pdv/balcao-pdv/releases/latest"
        );
        assert_eq!(cfg.user_agent, "balcao-pdv/1.0.0");
    }

    #[test]
    fn test_parse_repo() {
        assert_eq!(
            UpdateConfig::parse_repo("loja/pdv").unwrap(),
            ("loja".to_string(), "pdv".to_string())
        );
        assert!(UpdateConfig::parse_repo("pdv").is_err());
        assert!(UpdateConfig::parse_repo("a/b/c").is_err());
        assert!(UpdateConfig::parse_repo("/pdv").is_err());
    }
}
