//! Update orchestration
//!
//! Resolves the target release, decides per installation whether to run the
//! direct pipeline or hand off to Homebrew, and drives
//! download → verify → extract → replace. Batch operations process installs
//! one at a time and record a result per install.

use semver::Version;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::ArchiveFormat;
use crate::checksum::{parse_checksums, verify_file_checksum};
use crate::config::UpdaterConfig;
use crate::detect::{InstallDetector, InstallInfo};
use crate::download::{Downloader, Progress};
use crate::error::{IoResultExt, Result, UpdateError};
use crate::homebrew::HomebrewDelegate;
use crate::platform::Platform;
use crate::process::CommandRunner;
use crate::releases::ReleaseSource;
use crate::replace::replace_binary;
use crate::version;

/// Outcome of a successful update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub previous_version: String,
    pub new_version: String,
    pub binary_path: PathBuf,
}

/// Version snapshot for one installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallStatus {
    pub install: InstallInfo,
    pub current_version: String,
    pub latest_version: String,
    pub is_outdated: bool,
}

/// Per-install outcome of [`Updater::update_all`]
#[derive(Debug)]
pub struct UpdateAllResult {
    pub install: InstallInfo,
    pub result: Result<UpdateResult>,
    /// Not attempted; `result` carries the reason
    pub skipped: bool,
}

/// Per-install outcome of [`Updater::check_all`]
#[derive(Debug)]
pub struct CheckAllResult {
    pub install: InstallInfo,
    pub status: Result<InstallStatus>,
}

/// Self-update coordinator
pub struct Updater {
    config: UpdaterConfig,
    current_version: String,
    platform: Platform,
    releases: Arc<dyn ReleaseSource>,
    downloader: Downloader,
    detector: Option<InstallDetector>,
    homebrew: HomebrewDelegate,
    runner: Arc<dyn CommandRunner>,
    cancel: CancellationToken,
}

impl Updater {
    /// Create an updater for the running binary at `current_version`
    pub fn new(
        config: UpdaterConfig,
        current_version: impl Into<String>,
        releases: Arc<dyn ReleaseSource>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let downloader = Downloader::new(&config.network)?;
        let homebrew = HomebrewDelegate::new(config.homebrew_formula.clone(), runner.clone());
        let current_version = current_version.into();

        debug!(
            "Updater initialized: version={}, platform={}",
            current_version,
            Platform::current()
        );

        Ok(Self {
            config,
            current_version,
            platform: Platform::current(),
            releases,
            downloader,
            detector: None,
            homebrew,
            runner,
            cancel: CancellationToken::new(),
        })
    }

    /// Enable install classification and discovery
    pub fn with_detector(mut self, detector: InstallDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_homebrew(mut self, homebrew: HomebrewDelegate) -> Self {
        self.homebrew = homebrew;
        self
    }

    /// Download archives for another platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Abort downloads when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Tag of the latest published release
    pub async fn latest_tag(&self) -> Result<String> {
        let release = self
            .releases
            .latest_release(&self.config.repo_owner, &self.config.repo_name)
            .await?;
        Ok(release.tag_name)
    }

    /// Latest tag if it is newer than the running version
    ///
    /// Development builds always accept the latest tag. Returns
    /// [`UpdateError::AlreadyLatest`] when there is nothing newer.
    pub async fn check_latest(&self) -> Result<String> {
        let latest = self.latest_tag().await?;

        if version::is_dev(&self.current_version) {
            debug!("Development build, accepting latest release {}", latest);
            return Ok(latest);
        }

        if is_newer(&self.current_version, &latest)? {
            info!("Update available: {} -> {}", self.current_version, latest);
            Ok(latest)
        } else {
            Err(UpdateError::already_latest(&self.current_version))
        }
    }

    /// Normalize `input` to a `v`-prefixed tag and check the release exists
    pub async fn validate_target_version(&self, input: &str) -> Result<String> {
        let tag = version::normalize_tag(input)?;

        match self
            .releases
            .release_by_tag(&self.config.repo_owner, &self.config.repo_name, &tag)
            .await?
        {
            Some(_) => Ok(tag),
            None => Err(UpdateError::version_not_found(tag)),
        }
    }

    /// Update the running binary
    ///
    /// Without a detector the running binary is treated as a direct install.
    pub async fn update(&self, tag: &str, progress: Option<Progress>) -> Result<UpdateResult> {
        let install = match &self.detector {
            Some(detector) => detector.detect_current()?,
            None => {
                let exe = std::env::current_exe()
                    .io_context(|| "Failed to get current executable path")?;
                InstallInfo::direct(fs::canonicalize(&exe).unwrap_or(exe))
            }
        };

        self.update_at(tag, &install, progress).await
    }

    /// Update a specific installation
    ///
    /// An empty tag or `latest` follows the latest release and reports
    /// [`UpdateError::AlreadyLatest`] when the install is current. Any other
    /// tag is installed as given.
    pub async fn update_at(
        &self,
        tag: &str,
        install: &InstallInfo,
        progress: Option<Progress>,
    ) -> Result<UpdateResult> {
        let pinned = version::is_pinned(tag);

        if install.is_package_manager() {
            return if pinned {
                self.homebrew.upgrade_to_version(tag).await
            } else {
                self.homebrew.upgrade(&install.resolved_path).await
            };
        }

        let previous_version = self.installed_version(install).await;
        let tag = if pinned {
            version::normalize_tag(tag)?
        } else {
            let latest = self.latest_tag().await?;
            if !version::is_dev(&previous_version) && !is_newer(&previous_version, &latest)? {
                return Err(UpdateError::already_latest(previous_version));
            }
            latest
        };

        self.install_release(&tag, &install.resolved_path, progress)
            .await?;

        Ok(UpdateResult {
            previous_version,
            new_version: tag,
            binary_path: install.resolved_path.clone(),
        })
    }

    /// Update every installation on the search path
    ///
    /// Installs are processed in discovery order and a failure only affects
    /// its own entry. Homebrew installs are skipped when `tag` pins a version.
    pub async fn update_all<F>(&self, tag: &str, mut progress_for: F) -> Result<Vec<UpdateAllResult>>
    where
        F: FnMut(&InstallInfo) -> Option<Progress>,
    {
        let detector = self.detector.as_ref().ok_or(UpdateError::DetectorRequired)?;
        let installs = detector.find_all().await?;
        let pinned = version::is_pinned(tag);

        let mut results = Vec::with_capacity(installs.len());
        for install in installs {
            if pinned && install.is_package_manager() {
                warn!(
                    "Skipping {}: Homebrew cannot install pinned version {}",
                    install.display_path().display(),
                    tag
                );
                results.push(UpdateAllResult {
                    install,
                    result: Err(UpdateError::BrewVersionPin {
                        version: tag.to_string(),
                    }),
                    skipped: true,
                });
                continue;
            }

            if self.cancel.is_cancelled() {
                results.push(UpdateAllResult {
                    install,
                    result: Err(UpdateError::Cancelled),
                    skipped: true,
                });
                continue;
            }

            let progress = progress_for(&install);
            let result = self.update_at(tag, &install, progress).await;
            if let Err(e) = &result {
                if !e.is_already_latest() {
                    warn!("Update of {} failed: {}", install.display_path().display(), e);
                }
            }

            results.push(UpdateAllResult {
                install,
                result,
                skipped: false,
            });
        }

        Ok(results)
    }

    /// Version status of every installation on the search path
    pub async fn check_all(&self) -> Result<Vec<CheckAllResult>> {
        let detector = self.detector.as_ref().ok_or(UpdateError::DetectorRequired)?;
        let installs = detector.find_all().await?;

        let mut results = Vec::with_capacity(installs.len());
        for install in installs {
            let status = if install.is_package_manager() {
                self.homebrew
                    .check_outdated()
                    .await
                    .map(|brew| InstallStatus {
                        install: install.clone(),
                        current_version: brew.current,
                        latest_version: brew.latest,
                        is_outdated: brew.is_outdated,
                    })
            } else {
                self.direct_status(&install).await
            };

            results.push(CheckAllResult { install, status });
        }

        Ok(results)
    }

    async fn direct_status(&self, install: &InstallInfo) -> Result<InstallStatus> {
        let current_version = self.installed_version(install).await;
        let latest_version = self.latest_tag().await?;
        let is_outdated =
            version::is_dev(&current_version) || is_newer(&current_version, &latest_version)?;

        Ok(InstallStatus {
            install: install.clone(),
            current_version,
            latest_version,
            is_outdated,
        })
    }

    /// Download, verify, extract and swap in the release archive for `tag`
    async fn install_release(
        &self,
        tag: &str,
        target: &Path,
        progress: Option<Progress>,
    ) -> Result<()> {
        let archive_name = self
            .platform
            .archive_name(&self.config.binary_name, version::strip_prefix(tag));
        info!("Installing {} into {}", archive_name, target.display());

        let checksums_url = self.config.asset_url(tag, &self.config.checksums_file);
        let manifest = self
            .downloader
            .download_to_string(&checksums_url, &self.cancel)
            .await?;
        let checksums = parse_checksums(&manifest);
        let expected = checksums
            .get(&archive_name)
            .ok_or_else(|| UpdateError::ChecksumNotFound {
                file: archive_name.clone(),
            })?;

        let archive = tempfile::Builder::new()
            .prefix(&format!("{}-", self.config.binary_name))
            .suffix(&format!(".{}", self.platform.archive_extension()))
            .tempfile()
            .io_context(|| "Failed to create temporary archive file")?;

        let archive_url = self.config.asset_url(tag, &archive_name);
        self.downloader
            .download_to_file(&archive_url, archive.path(), progress, &self.cancel)
            .await?;

        verify_file_checksum(archive.path(), expected)?;
        debug!("Checksum verified for {}", archive_name);

        let extracted = ArchiveFormat::for_platform(&self.platform)
            .extract_binary(archive.path(), &self.config.binary_name)?;
        replace_binary(extracted.path(), target)?;

        if let Err(e) = extracted.cleanup() {
            warn!("Failed to remove extraction directory: {}", e);
        }

        info!("Replaced {} with {}", target.display(), tag);
        Ok(())
    }

    /// Version of an installed copy
    ///
    /// The running binary reports its own version. Other copies are asked
    /// via `--version`; if that fails the running version is assumed.
    async fn installed_version(&self, install: &InstallInfo) -> String {
        if self.is_running_binary(&install.resolved_path) {
            return self.current_version.clone();
        }

        let program = install.resolved_path.to_string_lossy();
        match self.runner.run(&program, &["--version"]).await {
            Ok(output) if output.success() => {
                let text = output.combined();
                if let Some(version) = version::extract_version(&text) {
                    return version.to_string();
                }
                if text.split_whitespace().any(version::is_dev) {
                    return version::DEV_VERSION.to_string();
                }
                debug!("No version in output of {} --version", program);
            }
            Ok(output) => debug!("{} --version exited with {:?}", program, output.exit_code),
            Err(e) => debug!("Could not query {}: {}", program, e),
        }

        self.current_version.clone()
    }

    fn is_running_binary(&self, path: &Path) -> bool {
        std::env::current_exe()
            .and_then(fs::canonicalize)
            .is_ok_and(|exe| exe == path)
    }
}

/// Whether `latest` is strictly newer than `current`
fn is_newer(current: &str, latest: &str) -> Result<bool> {
    let current: Version = version::parse_version(current)?;
    let latest: Version = version::parse_version(latest)?;
    Ok(current < latest)
}
