//! Atomic binary replacement
//!
//! The new executable is staged in a hidden temp file next to the target and
//! renamed over it, so the target is always either the old binary or the
//! complete new one. The staging file is removed on every failure path.

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{IoResultExt, Result};

/// Replace `target` with the contents of `new_binary`, keeping target's permissions
///
/// Fails without touching the filesystem if `target` does not exist.
pub fn replace_binary(new_binary: &Path, target: &Path) -> Result<()> {
    debug!("Replacing binary: {:?} -> {:?}", new_binary, target);

    let contents = fs::read(new_binary)
        .io_context(|| format!("Failed to read new binary {}", new_binary.display()))?;

    let permissions = fs::metadata(target)
        .io_context(|| format!("Failed to stat target binary {}", target.display()))?
        .permissions();

    let parent = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Same directory as the target so the rename stays on one filesystem
    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(parent)
        .io_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    staged
        .write_all(&contents)
        .io_context(|| "Failed to write new binary")?;
    staged
        .as_file()
        .sync_all()
        .io_context(|| "Failed to flush new binary")?;
    fs::set_permissions(staged.path(), permissions)
        .io_context(|| "Failed to set permissions on new binary")?;

    persist(staged, target)?;

    info!("Binary replaced successfully: {:?}", target);
    Ok(())
}

#[cfg(not(windows))]
fn persist(staged: NamedTempFile, target: &Path) -> Result<()> {
    // A failed persist hands the temp file back; dropping it deletes it
    staged
        .persist(target)
        .map(|_| ())
        .map_err(|e| e.error)
        .io_context(|| format!("Failed to rename new binary onto {}", target.display()))
}

#[cfg(windows)]
fn persist(staged: NamedTempFile, target: &Path) -> Result<()> {
    use std::io::ErrorKind;

    match staged.persist(target) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == ErrorKind::PermissionDenied => {
            // A running executable cannot be overwritten, but it can be renamed
            let old = target.with_extension("old");
            let _ = fs::remove_file(&old);
            let staged = e.file;
            install_beside(target, &old, || staged.persist(target).map(|_| ()).map_err(|e| e.error))
        }
        Err(e) => Err(e.error)
            .io_context(|| format!("Failed to rename new binary onto {}", target.display())),
    }
}

/// Move `target` to `old`, then run `install` to put the new binary in place
///
/// If `install` fails, `old` is renamed back so `target` still holds the
/// previous binary.
#[cfg(any(windows, test))]
fn install_beside(
    target: &Path,
    old: &Path,
    install: impl FnOnce() -> std::io::Result<()>,
) -> Result<()> {
    fs::rename(target, old).io_context(|| format!("Failed to move {} aside", target.display()))?;

    if let Err(e) = install() {
        if let Err(restore) = fs::rename(old, target) {
            tracing::warn!(
                "Failed to restore {} from {}: {}",
                target.display(),
                old.display(),
                restore
            );
        }
        return Err(e)
            .io_context(|| format!("Failed to rename new binary onto {}", target.display()));
    }

    Ok(())
}
