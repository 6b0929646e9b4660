//! Homebrew delegation for package-manager installs
//!
//! Homebrew owns the lifecycle of binaries under its prefix, so those
//! installs are upgraded through `brew` rather than replaced in place.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, UpdateError};
use crate::process::{CommandOutput, CommandRunner};
use crate::updater::UpdateResult;

/// Output fragments `brew upgrade` prints when there was nothing to do
const UP_TO_DATE_MARKERS: &[&str] = &["already installed", "already up-to-date"];

/// Installed and available formula versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewStatus {
    pub current: String,
    pub latest: String,
    pub is_outdated: bool,
}

/// `brew info --json=v2` document, reduced to the fields read here
#[derive(Debug, Deserialize)]
struct BrewInfo {
    #[serde(default)]
    formulae: Vec<BrewFormula>,
}

#[derive(Debug, Deserialize)]
struct BrewFormula {
    versions: BrewVersions,
    #[serde(default)]
    installed: Vec<BrewInstalled>,
}

#[derive(Debug, Deserialize)]
struct BrewVersions {
    stable: String,
}

#[derive(Debug, Deserialize)]
struct BrewInstalled {
    version: String,
}

/// Runs `brew` for a single formula
pub struct HomebrewDelegate {
    formula: String,
    runner: Arc<dyn CommandRunner>,
}

impl HomebrewDelegate {
    pub fn new(formula: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            formula: formula.into(),
            runner,
        }
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Compare the installed formula version against the stable one
    pub async fn check_outdated(&self) -> Result<BrewStatus> {
        let output = self
            .brew(&["info", "--json=v2", self.formula.as_str()])
            .await?;

        let info: BrewInfo = serde_json::from_str(&output.stdout)?;
        let formula = info
            .formulae
            .into_iter()
            .next()
            .ok_or_else(|| UpdateError::brew_metadata(format!("no formula {}", self.formula)))?;
        let installed = formula.installed.into_iter().next().ok_or_else(|| {
            UpdateError::brew_metadata(format!("{} is not installed", self.formula))
        })?;

        let status = BrewStatus {
            is_outdated: installed.version != formula.versions.stable,
            current: installed.version,
            latest: formula.versions.stable,
        };

        debug!(
            "Homebrew {}: installed={}, stable={}",
            self.formula, status.current, status.latest
        );
        Ok(status)
    }

    /// Upgrade the formula to its latest stable version
    ///
    /// `brew upgrade` exits zero when there is nothing to upgrade, so its
    /// output is inspected and [`UpdateError::AlreadyLatest`] is returned in
    /// that case. The match is on free-text output and may miss future
    /// wording changes.
    pub async fn upgrade(&self, binary_path: &Path) -> Result<UpdateResult> {
        let before = self.check_outdated().await?;

        info!("Upgrading {} via Homebrew", self.formula);
        let output = self.brew(&["upgrade", self.formula.as_str()]).await?;

        let combined = output.combined().to_lowercase();
        if UP_TO_DATE_MARKERS
            .iter()
            .any(|marker| combined.contains(marker))
        {
            info!("Homebrew reports {} is up to date", self.formula);
            return Err(UpdateError::already_latest(before.current));
        }

        let new_version = match self.check_outdated().await {
            Ok(after) => after.current,
            Err(e) => {
                warn!(
                    "Could not read {} version after upgrade: {}",
                    self.formula, e
                );
                before.latest
            }
        };

        info!(
            "Homebrew upgraded {} from {} to {}",
            self.formula, before.current, new_version
        );

        Ok(UpdateResult {
            previous_version: before.current,
            new_version,
            binary_path: binary_path.to_path_buf(),
        })
    }

    /// Pinned versions cannot be installed from the tap
    ///
    /// The tap carries a single formula file, so this always fails with
    /// [`UpdateError::BrewVersionPin`].
    pub async fn upgrade_to_version(&self, tag: &str) -> Result<UpdateResult> {
        Err(UpdateError::BrewVersionPin {
            version: tag.to_string(),
        })
    }

    async fn brew(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.runner.run("brew", args).await?;

        if !output.success() {
            return Err(UpdateError::CommandFailed {
                command: format!("brew {}", args.join(" ")),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}
