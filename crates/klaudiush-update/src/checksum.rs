//! SHA256 checksum manifest parsing and verification

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::error::{IoResultExt, Result, UpdateError};

/// Parse a `<digest>  <filename>` manifest into a filename -> digest map
///
/// Blank lines and lines without the two-space separator are skipped.
/// Digests are lowercased; a repeated filename keeps its last digest.
pub fn parse_checksums(manifest: &str) -> HashMap<String, String> {
    let mut checksums = HashMap::new();

    for line in manifest.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((digest, file_name)) = line.split_once("  ") else {
            continue;
        };

        let (digest, file_name) = (digest.trim(), file_name.trim());
        if digest.is_empty() || file_name.is_empty() {
            continue;
        }

        checksums.insert(file_name.to_string(), digest.to_ascii_lowercase());
    }

    checksums
}

/// Calculate the lowercase hex SHA256 digest of a file
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .io_context(|| format!("Failed to open {} for checksum", path.display()))?;
    let mut hasher = Sha256::new();

    io::copy(&mut file, &mut hasher)
        .io_context(|| format!("Failed to read {} for checksum", path.display()))?;

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file against an expected hex digest (case-insensitive)
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = calculate_checksum(path)?;
    let expected = expected.trim();

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(UpdateError::ChecksumMismatch {
            expected: expected.to_ascii_lowercase(),
            actual,
        });
    }

    debug!("Checksum verified for {}", path.display());
    Ok(())
}
