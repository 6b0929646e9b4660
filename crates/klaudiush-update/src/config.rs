//! Updater configuration
//!
//! Defines where releases are fetched from, how they are named, and the
//! network parameters used for downloads. Values come from defaults and may
//! be overridden through environment variables; no config files are read.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Override for the GitHub API base URL
pub const ENV_API_URL: &str = "KLAUDIUSH_UPDATE_API_URL";

/// Override for the release download host
pub const ENV_DOWNLOAD_HOST: &str = "KLAUDIUSH_UPDATE_DOWNLOAD_HOST";

/// Override for the download timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "KLAUDIUSH_UPDATE_TIMEOUT_SECS";

/// Token sent to the GitHub API
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Complete updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdaterConfig {
    /// Name of the released executable
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Repository owner
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// Repository name
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Host serving release assets and release pages
    #[serde(default = "default_download_host")]
    pub download_host: String,

    /// Base URL for the GitHub API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Token for authenticated API requests
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Name of the checksums manifest asset
    #[serde(default = "default_checksums_file")]
    pub checksums_file: String,

    /// Homebrew formula passed to every brew invocation
    #[serde(default = "default_homebrew_formula")]
    pub homebrew_formula: String,

    /// Path fragments identifying a Homebrew-managed binary
    #[serde(default = "default_homebrew_markers")]
    pub homebrew_markers: Vec<String>,

    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            binary_name: default_binary_name(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            download_host: default_download_host(),
            api_url: default_api_url(),
            api_token: None,
            checksums_file: default_checksums_file(),
            homebrew_formula: default_homebrew_formula(),
            homebrew_markers: default_homebrew_markers(),
            network: NetworkConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply environment overrides in place
    pub fn apply_env(&mut self) {
        if let Some(url) = env_non_empty(ENV_API_URL) {
            debug!("Using API URL override: {}", url);
            self.api_url = url;
        }
        if let Some(host) = env_non_empty(ENV_DOWNLOAD_HOST) {
            debug!("Using download host override: {}", host);
            self.download_host = host;
        }
        if let Some(secs) = env_non_empty(ENV_TIMEOUT_SECS).and_then(|s| s.parse::<u64>().ok()) {
            self.network.download_timeout_secs = secs;
        }
        if let Some(token) = env_non_empty(ENV_GITHUB_TOKEN) {
            self.api_token = Some(token);
        }
    }

    /// URL of a release asset: `<host>/<owner>/<repo>/releases/download/<tag>/<file>`
    pub fn asset_url(&self, tag: &str, file: &str) -> String {
        format!(
            "{}/{}/{}/releases/download/{}/{}",
            self.download_host.trim_end_matches('/'),
            self.repo_owner,
            self.repo_name,
            tag,
            file
        )
    }

    /// Human-facing release page: `<host>/<owner>/<repo>/releases/tag/<tag>`
    pub fn release_page_url(&self, tag: &str) -> String {
        format!(
            "{}/{}/{}/releases/tag/{}",
            self.download_host.trim_end_matches('/'),
            self.repo_owner,
            self.repo_name,
            tag
        )
    }
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// API request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_binary_name() -> String {
    crate::BINARY_NAME.to_string()
}
fn default_repo_owner() -> String {
    crate::REPO_OWNER.to_string()
}
fn default_repo_name() -> String {
    crate::REPO_NAME.to_string()
}
fn default_download_host() -> String {
    "https://github.com".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_checksums_file() -> String {
    "checksums.txt".to_string()
}
fn default_homebrew_formula() -> String {
    format!("{}/tap/{}", crate::REPO_OWNER, crate::BINARY_NAME)
}
fn default_homebrew_markers() -> Vec<String> {
    vec![
        "/cellar/".to_string(),
        "/opt/homebrew/".to_string(),
        "/linuxbrew/".to_string(),
    ]
}
fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_user_agent() -> String {
    format!(
        "klaudiush/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
