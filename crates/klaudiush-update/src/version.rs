//! Version parsing and tag normalization

use semver::Version;

use crate::error::{Result, UpdateError};

/// Version reported by development builds
pub const DEV_VERSION: &str = "dev";

/// Target meaning "whatever the latest release is"
pub const LATEST: &str = "latest";

/// Development builds have no meaningful version to compare against
pub fn is_dev(version: &str) -> bool {
    version.trim() == DEV_VERSION
}

/// Strip a single leading `v` from a tag
pub fn strip_prefix(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Parse a version with or without the leading `v`
pub fn parse_version(input: &str) -> Result<Version> {
    Version::parse(strip_prefix(input)).map_err(|_| UpdateError::invalid_version(input.trim()))
}

/// Canonical release tag (`v<semver>`) for user input such as `1.2.3` or `v1.2.3`
pub fn normalize_tag(input: &str) -> Result<String> {
    Ok(format!("v{}", parse_version(input)?))
}

/// Whether a target tag pins a version rather than following the latest release
pub fn is_pinned(tag: &str) -> bool {
    let tag = tag.trim();
    !(tag.is_empty() || tag.eq_ignore_ascii_case(LATEST))
}

/// First whitespace-separated token of `text` that parses as a version
///
/// Handles `--version` output such as `klaudiush version 1.13.0 (abc123)`.
pub fn extract_version(text: &str) -> Option<Version> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == '(' || c == ')'))
        .find_map(|token| Version::parse(strip_prefix(token)).ok())
}
