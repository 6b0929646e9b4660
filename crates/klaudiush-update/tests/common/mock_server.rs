//! Mock server helpers for release API and asset downloads
//!
//! A single server plays both api.github.com and github.com; point a
//! config at it with [`test_config`].

use klaudiush_update::UpdaterConfig;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Updater config whose API and download host are the mock server
pub fn test_config(server: &MockServer) -> UpdaterConfig {
    UpdaterConfig {
        api_url: server.uri(),
        download_host: server.uri(),
        ..UpdaterConfig::default()
    }
}

fn release_body(tag: &str) -> serde_json::Value {
    json!({
        "tag_name": tag,
        "name": tag,
        "html_url": format!("https://github.com/smykla-labs/klaudiush/releases/tag/{}", tag),
        "draft": false,
        "prerelease": false,
        "assets": []
    })
}

/// `GET /repos/smykla-labs/klaudiush/releases/latest` returns `tag`
pub async fn mock_latest_release(server: &MockServer, tag: &str) {
    Mock::given(method("GET"))
        .and(path("/repos/smykla-labs/klaudiush/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body(tag)))
        .mount(server)
        .await;
}

/// `GET /repos/smykla-labs/klaudiush/releases/tags/<tag>` returns the release
pub async fn mock_release_by_tag(server: &MockServer, tag: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/smykla-labs/klaudiush/releases/tags/{}", tag)))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body(tag)))
        .mount(server)
        .await;
}

pub fn asset_path(tag: &str, file: &str) -> String {
    format!("/smykla-labs/klaudiush/releases/download/{}/{}", tag, file)
}

/// Serve a release asset
pub async fn mock_asset(server: &MockServer, tag: &str, file: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(asset_path(tag, file)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Answer a release asset request with a bare status code
pub async fn mock_asset_status(server: &MockServer, tag: &str, file: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(asset_path(tag, file)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `TAG_V1_13_1` for linux/amd64: archive plus matching checksums
pub async fn mock_release_assets(server: &MockServer, binary_content: &[u8]) {
    let archive = super::fixtures::tar_gz_archive(&[(BINARY, binary_content)]);
    let manifest = super::fixtures::checksums_manifest(&[
        (ARCHIVE_LINUX_AMD64, archive.as_slice()),
        ("klaudiush_1.13.1_darwin_arm64.tar.gz", &b"other platform"[..]),
    ]);

    mock_asset(server, TAG_V1_13_1, CHECKSUMS_FILE, manifest.as_bytes()).await;
    mock_asset(server, TAG_V1_13_1, ARCHIVE_LINUX_AMD64, &archive).await;
}
