//! Update command

use anyhow::{bail, Context, Result};
use klaudiush_update::{
    CheckAllResult, CommandRunner, GitHubReleases, InstallDetector, SystemRunner,
    UpdateAllResult, Updater, UpdaterConfig, VERSION,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::UpdateArgs;
use crate::output;

pub async fn run(args: UpdateArgs) -> Result<()> {
    let config = UpdaterConfig::from_env();
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let releases = Arc::new(GitHubReleases::new(&config)?);
    let detector = InstallDetector::new(&config, runner.clone());

    let updater = Updater::new(config, VERSION, releases, runner)?
        .with_detector(detector)
        .with_cancellation(cancel_on_ctrl_c());

    match (args.check, args.all) {
        (true, false) => check(&updater).await,
        (true, true) => check_all(&updater, args.json).await,
        (false, false) => update(&updater, args.to.as_deref()).await,
        (false, true) => update_all(&updater, args.to.as_deref()).await,
    }
}

/// Token cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

/// Validated tag for `--to`, or the empty "follow latest" target
async fn resolve_target(updater: &Updater, to: Option<&str>) -> Result<String> {
    let Some(requested) = to else {
        return Ok(String::new());
    };

    let spinner = output::spinner(&format!("Looking up release {}...", requested));
    let tag = updater.validate_target_version(requested).await;
    spinner.finish_and_clear();

    Ok(tag?)
}

async fn check(updater: &Updater) -> Result<()> {
    output::info(&format!("Current version: {}", VERSION));

    let spinner = output::spinner("Checking for updates...");
    let latest = updater.check_latest().await;
    spinner.finish_and_clear();

    match latest {
        Ok(tag) => {
            output::success(&format!("Update available: {}", tag));
            output::kv("Release", &updater.config().release_page_url(&tag));
            output::info("Run 'klaudiush update' to install the update");
            Ok(())
        }
        Err(e) if e.is_already_latest() => {
            output::success("Already on the latest version");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to check for updates"),
    }
}

async fn update(updater: &Updater, to: Option<&str>) -> Result<()> {
    let tag = resolve_target(updater, to).await?;

    let (bar, progress) = output::download_progress("Updating klaudiush");
    let result = updater.update(&tag, Some(progress)).await;
    bar.finish_and_clear();

    match result {
        Ok(result) => {
            output::success(&format!(
                "Updated klaudiush {} -> {}",
                result.previous_version, result.new_version
            ));
            output::kv("Binary", &result.binary_path.display().to_string());
            Ok(())
        }
        Err(e) if e.is_already_latest() => {
            output::success(&format!("Already on the latest version ({})", VERSION));
            Ok(())
        }
        Err(e) if e.is_brew_version_pin() => {
            output::warning("klaudiush is managed by Homebrew");
            bail!("{}", e)
        }
        Err(e) => Err(e).context("Update failed"),
    }
}

async fn update_all(updater: &Updater, to: Option<&str>) -> Result<()> {
    let tag = resolve_target(updater, to).await?;

    let mut bars: Vec<indicatif::ProgressBar> = Vec::new();
    let results = updater
        .update_all(&tag, |install| {
            if let Some(previous) = bars.last() {
                previous.finish_and_clear();
            }
            let (bar, progress) =
                output::download_progress(&install.display_path().display().to_string());
            bars.push(bar);
            Some(progress)
        })
        .await?;
    for bar in &bars {
        bar.finish_and_clear();
    }

    output::header("Update results");
    report_updates(&results);

    let failed = failure_count(&results);
    if failed > 0 {
        bail!("{} of {} installations failed to update", failed, results.len());
    }
    Ok(())
}

fn report_updates(results: &[UpdateAllResult]) {
    for entry in results {
        let path = entry.install.display_path().display().to_string();
        match &entry.result {
            Ok(result) => output::success(&format!(
                "{}: {} -> {}",
                path, result.previous_version, result.new_version
            )),
            Err(e) if e.is_already_latest() => {
                output::success(&format!("{}: already up to date", path))
            }
            Err(e) if entry.skipped => output::warning(&format!("{}: skipped, {}", path, e)),
            Err(e) => output::error(&format!("{}: {}", path, e)),
        }
    }
}

/// Entries that were attempted and failed
fn failure_count(results: &[UpdateAllResult]) -> usize {
    results
        .iter()
        .filter(|entry| !entry.skipped)
        .filter(|entry| matches!(&entry.result, Err(e) if !e.is_already_latest()))
        .count()
}

/// JSON row for `update --check --all --json`
#[derive(Debug, Serialize)]
struct StatusRow {
    path: String,
    method: String,
    current_version: Option<String>,
    latest_version: Option<String>,
    is_outdated: Option<bool>,
    error: Option<String>,
}

impl From<&CheckAllResult> for StatusRow {
    fn from(entry: &CheckAllResult) -> Self {
        let path = entry.install.display_path().display().to_string();
        let method = entry.install.method.to_string();

        match &entry.status {
            Ok(status) => Self {
                path,
                method,
                current_version: Some(status.current_version.clone()),
                latest_version: Some(status.latest_version.clone()),
                is_outdated: Some(status.is_outdated),
                error: None,
            },
            Err(e) => Self {
                path,
                method,
                current_version: None,
                latest_version: None,
                is_outdated: None,
                error: Some(e.to_string()),
            },
        }
    }
}

async fn check_all(updater: &Updater, json: bool) -> Result<()> {
    let spinner = output::spinner("Checking installations...");
    let results = updater.check_all().await;
    spinner.finish_and_clear();
    let results = results.context("Failed to check installations")?;

    let rows: Vec<StatusRow> = results.iter().map(StatusRow::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    output::header("Installations");
    for row in &rows {
        match (&row.error, row.is_outdated) {
            (Some(error), _) => output::error(&format!("{} ({}): {}", row.path, row.method, error)),
            (None, Some(true)) => output::warning(&format!(
                "{} ({}): {} -> {} available",
                row.path,
                row.method,
                row.current_version.as_deref().unwrap_or("?"),
                row.latest_version.as_deref().unwrap_or("?")
            )),
            (None, _) => output::success(&format!(
                "{} ({}): {} is up to date",
                row.path,
                row.method,
                row.current_version.as_deref().unwrap_or("?")
            )),
        }
    }

    if rows.iter().any(|row| row.is_outdated == Some(true)) {
        output::info("Run 'klaudiush update --all' to update them");
    }
    Ok(())
}
