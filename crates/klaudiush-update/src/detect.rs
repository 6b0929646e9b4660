//! Installation discovery and classification
//!
//! Finds every copy of the binary reachable through the search path,
//! resolves symlinks, and classifies each copy as a direct install or a
//! Homebrew-managed one. Copies resolving to the same real file are
//! reported once.

use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::error::{IoResultExt, Result, UpdateError};
use crate::process::CommandRunner;

/// How a binary was installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    /// Downloaded release archive, updated by replacing the file
    Direct,
    /// Owned by Homebrew, updated through `brew`
    PackageManager,
}

impl InstallMethod {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::PackageManager => "homebrew",
        }
    }
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One discovered binary on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallInfo {
    /// Real path with all symlinks followed
    pub resolved_path: PathBuf,

    /// Path as found, when it differs from the resolved one
    pub original_symlink_path: Option<PathBuf>,

    pub method: InstallMethod,
}

impl InstallInfo {
    /// Direct install at an already resolved path
    pub fn direct(resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            resolved_path: resolved_path.into(),
            original_symlink_path: None,
            method: InstallMethod::Direct,
        }
    }

    /// Path the user knows this install by
    pub fn display_path(&self) -> &Path {
        self.original_symlink_path
            .as_deref()
            .unwrap_or(&self.resolved_path)
    }

    pub fn is_package_manager(&self) -> bool {
        self.method == InstallMethod::PackageManager
    }
}

/// Discovers and classifies installed copies of the binary
pub struct InstallDetector {
    binary_name: String,
    markers: Vec<String>,
    runner: Arc<dyn CommandRunner>,
    search_path: Option<OsString>,
}

impl InstallDetector {
    pub fn new(config: &UpdaterConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary_name: config.binary_name.clone(),
            markers: config
                .homebrew_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            runner,
            search_path: None,
        }
    }

    /// Walk this search path instead of `PATH` when the lookup tool fails
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Classify a path, following symlinks
    ///
    /// A path that cannot be resolved is assumed to be a direct install.
    pub fn detect_method(&self, path: &Path) -> InstallMethod {
        match fs::canonicalize(path) {
            Ok(resolved) => self.classify(&resolved),
            Err(e) => {
                debug!("Could not resolve {:?} ({}), assuming direct install", path, e);
                InstallMethod::Direct
            }
        }
    }

    /// Classify an already resolved path by its Homebrew markers
    pub fn classify(&self, resolved: &Path) -> InstallMethod {
        let path = resolved.to_string_lossy().replace('\\', "/").to_lowercase();

        if self.markers.iter().any(|marker| path.contains(marker.as_str())) {
            InstallMethod::PackageManager
        } else {
            InstallMethod::Direct
        }
    }

    /// Resolve and classify one path
    pub fn inspect(&self, path: &Path) -> Result<InstallInfo> {
        let resolved = fs::canonicalize(path)
            .io_context(|| format!("Failed to resolve {}", path.display()))?;

        let original_symlink_path = (resolved != path).then(|| path.to_path_buf());
        let method = self.classify(&resolved);

        Ok(InstallInfo {
            resolved_path: resolved,
            original_symlink_path,
            method,
        })
    }

    /// Install info for the running executable
    pub fn detect_current(&self) -> Result<InstallInfo> {
        let exe = std::env::current_exe().io_context(|| "Failed to get current executable path")?;
        let info = self.inspect(&exe)?;

        debug!(
            "Current binary: {:?} ({})",
            info.resolved_path, info.method
        );
        Ok(info)
    }

    /// Every install reachable through the search path, deduplicated by real path
    pub async fn find_all(&self) -> Result<Vec<InstallInfo>> {
        let candidates = match self.locate_with_tool().await {
            Some(paths) if !paths.is_empty() => paths,
            _ => {
                warn!(
                    "Lookup tool found no {}, scanning the search path directly",
                    self.binary_name
                );
                self.locate_on_search_path()
            }
        };

        let mut seen = HashSet::new();
        let mut installs = Vec::new();

        for candidate in candidates {
            match self.inspect(&candidate) {
                Ok(info) => {
                    if seen.insert(info.resolved_path.clone()) {
                        installs.push(info);
                    } else {
                        debug!("Skipping duplicate install {:?}", candidate);
                    }
                }
                Err(e) => debug!("Skipping {:?}: {}", candidate, e),
            }
        }

        if installs.is_empty() {
            return Err(UpdateError::NoInstallation {
                binary: self.binary_name.clone(),
            });
        }

        info!("Found {} {} installation(s)", installs.len(), self.binary_name);
        Ok(installs)
    }

    /// `which -a` (or `where` on Windows); `None` when the tool fails
    async fn locate_with_tool(&self) -> Option<Vec<PathBuf>> {
        let (program, args): (&str, Vec<&str>) = if cfg!(windows) {
            ("where", vec![self.binary_name.as_str()])
        } else {
            ("which", vec!["-a", self.binary_name.as_str()])
        };

        let output = match self.runner.run(program, &args).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                debug!("{} exited with {:?}", program, output.exit_code);
                return None;
            }
            Err(e) => {
                debug!("{} unavailable: {}", program, e);
                return None;
            }
        };

        Some(
            output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
        )
    }

    fn locate_on_search_path(&self) -> Vec<PathBuf> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        match which::which_in_all(&self.binary_name, search_path, cwd) {
            Ok(paths) => paths.collect(),
            Err(e) => {
                debug!("Search path scan failed: {}", e);
                Vec::new()
            }
        }
    }
}
