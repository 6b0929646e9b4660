//! Binary extraction from release archives
//!
//! Release archives are `.tar.gz` on POSIX platforms and `.zip` on Windows.
//! Only the named executable is written out, into a fresh scratch directory
//! that is removed when the returned [`ExtractedBinary`] is dropped.
//!
//! Every entry in the archive is checked against the scratch directory, not
//! only those before the match: an entry such as `../../etc/cron.d/evil`
//! anywhere in the archive fails the whole extraction with
//! [`UpdateError::PathTraversal`].

use flate2::read::GzDecoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info};

use crate::error::{IoResultExt, Result, UpdateError};
use crate::platform::Platform;

/// Archive format of a release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Format used for a platform's release archives
    pub fn for_platform(platform: &Platform) -> Self {
        if platform.is_windows() {
            Self::Zip
        } else {
            Self::TarGz
        }
    }

    /// Extract `binary_name` from the archive into a new scratch directory
    ///
    /// The entry is matched on its base name at any directory depth; the
    /// first match wins. Zip archives also accept `<binary_name>.exe`.
    pub fn extract_binary(self, archive_path: &Path, binary_name: &str) -> Result<ExtractedBinary> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-extract-", binary_name))
            .tempdir()
            .io_context(|| "Failed to create extraction directory")?;

        debug!(
            "Extracting {} from {:?} into {:?}",
            binary_name,
            archive_path,
            scratch.path()
        );

        let path = match self {
            Self::TarGz => extract_from_tar_gz(archive_path, binary_name, scratch.path())?,
            Self::Zip => extract_from_zip(archive_path, binary_name, scratch.path())?,
        };

        info!("Extracted binary: {:?}", path);
        Ok(ExtractedBinary { path, scratch })
    }
}

/// An executable extracted into its own scratch directory
///
/// Dropping the value removes the scratch directory recursively.
#[derive(Debug)]
pub struct ExtractedBinary {
    path: PathBuf,
    scratch: TempDir,
}

impl ExtractedBinary {
    /// Path of the extracted executable
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory holding the executable
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Remove the scratch directory, reporting failures instead of ignoring them
    pub fn cleanup(self) -> Result<()> {
        let dir = self.scratch.path().to_path_buf();
        self.scratch
            .close()
            .io_context(|| format!("Failed to remove extraction directory {}", dir.display()))
    }
}

fn extract_from_tar_gz(archive_path: &Path, binary_name: &str, scratch: &Path) -> Result<PathBuf> {
    let file = File::open(archive_path)
        .io_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;

    // The stream is read once, so entries after the match are still checked
    // and an escape there discards the binary already written
    let mut extracted = None;

    for entry in entries {
        let mut entry = entry.map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| UpdateError::archive_corrupt(archive_path, e))?
            .into_owned();
        let entry_type = entry.header().entry_type();

        let Some(output) =
            checked_output_path(scratch, &entry_path.to_string_lossy(), entry_type.is_dir())?
        else {
            continue;
        };

        if extracted.is_some() || !entry_type.is_file() {
            continue;
        }

        let matches = entry_path
            .file_name()
            .is_some_and(|name| name == binary_name);
        if !matches {
            continue;
        }

        write_executable(&output, &mut entry, archive_path)?;
        extracted = Some(output);
    }

    extracted.ok_or_else(|| UpdateError::BinaryNotFoundInArchive {
        binary: binary_name.to_string(),
    })
}

fn extract_from_zip(archive_path: &Path, binary_name: &str, scratch: &Path) -> Result<PathBuf> {
    let file = File::open(archive_path)
        .io_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;

    let windows_name = format!("{}.exe", binary_name);
    let mut found = None;

    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;
        let entry_name = entry.name().to_string();

        let Some(output) = checked_output_path(scratch, &entry_name, entry.is_dir())? else {
            continue;
        };

        if found.is_some() || entry.is_dir() {
            continue;
        }

        let base_name = entry_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(entry_name.as_str());
        if base_name == binary_name || base_name == windows_name {
            found = Some((index, output));
        }
    }

    let Some((index, output)) = found else {
        return Err(UpdateError::BinaryNotFoundInArchive {
            binary: binary_name.to_string(),
        });
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;
    write_executable(&output, &mut entry, archive_path)?;

    Ok(output)
}

/// Resolve where an entry would land, rejecting anything outside `scratch`
///
/// Returns `None` for directory entries that denote the scratch root itself
/// (such as `./`), which have nothing to write.
fn checked_output_path(scratch: &Path, entry_name: &str, is_dir: bool) -> Result<Option<PathBuf>> {
    let mut cleaned = PathBuf::new();

    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    return Err(path_traversal(scratch, entry_name));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(path_traversal(scratch, entry_name));
            }
        }
    }

    if cleaned.as_os_str().is_empty() {
        if is_dir {
            return Ok(None);
        }
        return Err(path_traversal(scratch, entry_name));
    }

    let output = scratch.join(&cleaned);
    if !output.starts_with(scratch) || output == scratch {
        return Err(path_traversal(scratch, entry_name));
    }

    Ok(Some(output))
}

fn path_traversal(scratch: &Path, entry_name: &str) -> UpdateError {
    error!(
        "Rejected archive entry {:?}: resolves outside {}",
        entry_name,
        scratch.display()
    );
    UpdateError::PathTraversal {
        entry: entry_name.to_string(),
    }
}

fn write_executable(output: &Path, reader: &mut impl Read, archive_path: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .io_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }

    let mut file = options
        .open(output)
        .io_context(|| format!("Failed to create {}", output.display()))?;

    io::copy(reader, &mut file).map_err(|e| UpdateError::archive_corrupt(archive_path, e))?;
    file.sync_all()
        .io_context(|| format!("Failed to flush {}", output.display()))?;

    Ok(())
}
