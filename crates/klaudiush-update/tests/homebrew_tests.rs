//! Integration tests for Homebrew delegation
//!
//! Tests cover:
//! - Parsing `brew info --json=v2`
//! - "Already installed" detection on upgrade
//! - Post-upgrade version re-check and its fallback
//! - The version pinning limitation

mod common;

use common::*;
use klaudiush_update::{HomebrewDelegate, UpdateError};
use std::path::Path;
use std::sync::Arc;

const BREW_INFO: &str = "brew info --json=v2 smykla-labs/tap/klaudiush";
const BREW_UPGRADE: &str = "brew upgrade smykla-labs/tap/klaudiush";

fn delegate(runner: Arc<ScriptedRunner>) -> HomebrewDelegate {
    HomebrewDelegate::new(FORMULA, runner)
}

fn brew_binary() -> &'static Path {
    Path::new("/opt/homebrew/Cellar/klaudiush/1.13.0/bin/klaudiush")
}

#[tokio::test]
async fn test_check_outdated() {
    let runner = Arc::new(
        ScriptedRunner::new().respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_0, VERSION_1_13_1))),
    );

    let status = delegate(runner).check_outdated().await.unwrap();

    assert_eq!(status.current, VERSION_1_13_0);
    assert_eq!(status.latest, VERSION_1_13_1);
    assert!(status.is_outdated);
}

#[tokio::test]
async fn test_check_outdated_up_to_date() {
    let runner = Arc::new(
        ScriptedRunner::new().respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_1, VERSION_1_13_1))),
    );

    let status = delegate(runner).check_outdated().await.unwrap();
    assert!(!status.is_outdated);
}

#[tokio::test]
async fn test_check_outdated_not_installed() {
    let json = r#"{"formulae":[{"versions":{"stable":"1.13.1"},"installed":[]}],"casks":[]}"#;
    let runner = Arc::new(ScriptedRunner::new().respond(BREW_INFO, ok(json)));

    let err = delegate(runner).check_outdated().await.unwrap_err();
    assert!(matches!(err, UpdateError::BrewMetadata { .. }));
}

#[tokio::test]
async fn test_check_outdated_no_formula() {
    let runner = Arc::new(ScriptedRunner::new().respond(BREW_INFO, ok(r#"{"formulae":[],"casks":[]}"#)));

    let err = delegate(runner).check_outdated().await.unwrap_err();
    assert!(matches!(err, UpdateError::BrewMetadata { .. }));
}

#[tokio::test]
async fn test_check_outdated_brew_fails() {
    let runner = Arc::new(
        ScriptedRunner::new().respond(BREW_INFO, failed(1, "Error: No available formula")),
    );

    let err = delegate(runner).check_outdated().await.unwrap_err();
    assert!(matches!(err, UpdateError::CommandFailed { code: Some(1), .. }));
}

#[tokio::test]
async fn test_check_outdated_brew_missing() {
    let err = delegate(Arc::new(ScriptedRunner::new()))
        .check_outdated()
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::CommandSpawn { .. }));
}

#[tokio::test]
async fn test_upgrade_already_installed_is_already_latest() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_1, VERSION_1_13_1)))
            .respond(
                BREW_UPGRADE,
                ok_stderr("Warning: smykla-labs/tap/klaudiush 1.13.1 already installed\n"),
            ),
    );

    let err = delegate(runner).upgrade(brew_binary()).await.unwrap_err();

    assert!(err.is_already_latest());
}

#[tokio::test]
async fn test_upgrade_already_up_to_date_any_case() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_1, VERSION_1_13_1)))
            .respond(BREW_UPGRADE, ok("Already up-to-date.\n")),
    );

    let err = delegate(runner).upgrade(brew_binary()).await.unwrap_err();
    assert!(err.is_already_latest());
}

#[tokio::test]
async fn test_upgrade_reports_new_version() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_0, VERSION_1_13_1)))
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_1, VERSION_1_13_1)))
            .respond(
                BREW_UPGRADE,
                ok("==> Upgrading smykla-labs/tap/klaudiush\n  1.13.0 -> 1.13.1\n"),
            ),
    );

    let result = delegate(runner.clone()).upgrade(brew_binary()).await.unwrap();

    assert_eq!(result.previous_version, VERSION_1_13_0);
    assert_eq!(result.new_version, VERSION_1_13_1);
    assert_eq!(result.binary_path, brew_binary());
    assert_eq!(
        runner.calls(),
        vec![BREW_INFO.to_string(), BREW_UPGRADE.to_string(), BREW_INFO.to_string()]
    );
}

#[tokio::test]
async fn test_upgrade_recheck_failure_falls_back_to_previous_latest() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_0, VERSION_1_13_1)))
            .respond(BREW_INFO, failed(1, "Error: something went wrong"))
            .respond(BREW_UPGRADE, ok("==> Upgrading smykla-labs/tap/klaudiush\n")),
    );

    let result = delegate(runner).upgrade(brew_binary()).await.unwrap();

    assert_eq!(result.previous_version, VERSION_1_13_0);
    assert_eq!(result.new_version, VERSION_1_13_1);
}

#[tokio::test]
async fn test_upgrade_failure_is_command_failed() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .respond(BREW_INFO, ok(&brew_info_json(VERSION_1_13_0, VERSION_1_13_1)))
            .respond(BREW_UPGRADE, failed(1, "Error: permission denied")),
    );

    let err = delegate(runner).upgrade(brew_binary()).await.unwrap_err();

    assert!(matches!(err, UpdateError::CommandFailed { ref stderr, .. } if stderr.contains("permission denied")));
}

#[tokio::test]
async fn test_upgrade_to_version_always_fails() {
    let runner = Arc::new(ScriptedRunner::new());

    let err = delegate(runner.clone())
        .upgrade_to_version(TAG_V1_13_0)
        .await
        .unwrap_err();

    assert!(err.is_brew_version_pin());
    assert!(runner.calls().is_empty());
}
