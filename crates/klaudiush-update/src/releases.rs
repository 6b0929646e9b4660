//! GitHub release metadata

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};

/// Release information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v1.13.0")
    pub tag_name: String,

    /// Release name
    #[serde(default)]
    pub name: Option<String>,

    /// Human-facing release page
    #[serde(default)]
    pub html_url: String,
}

/// Source of release metadata for a repository
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest published release
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release>;

    /// Release for an exact tag; `None` when no such release exists
    async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<Release>>;
}

/// Release client for the GitHub REST API
///
/// Lookups are cached per repository (and per tag) for the lifetime of the
/// client, so repeated checks across installs hit the network once.
pub struct GitHubReleases {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    cache: Mutex<HashMap<String, Release>>,
}

impl GitHubReleases {
    /// Create a release client from updater configuration
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(config.network.http_timeout())
            .build()
            .map_err(UpdateError::HttpClient)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Drop all cached lookups
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn cached(&self, key: &str) -> Option<Release> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: String, release: &Release) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, release.clone());
        }
    }

    async fn fetch(&self, url: &str) -> Result<Option<Release>> {
        debug!("Fetching release from: {}", url);

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|source| UpdateError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let release = response
            .json::<Release>()
            .await
            .map_err(|source| UpdateError::Network {
                url: url.to_string(),
                source,
            })?;
        Ok(Some(release))
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleases {
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let key = format!("{}/{}@latest", owner, repo);
        if let Some(release) = self.cached(&key) {
            return Ok(release);
        }

        let url = format!("{}/repos/{}/{}/releases/latest", self.api_url, owner, repo);
        let release = self
            .fetch(&url)
            .await?
            .ok_or_else(|| UpdateError::version_not_found("latest"))?;

        self.store(key, &release);
        Ok(release)
    }

    async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<Release>> {
        let key = format!("{}/{}@{}", owner, repo, tag);
        if let Some(release) = self.cached(&key) {
            return Ok(Some(release));
        }

        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_url, owner, repo, tag
        );
        let release = self.fetch(&url).await?;

        if let Some(release) = &release {
            self.store(key, release);
        }
        Ok(release)
    }
}
