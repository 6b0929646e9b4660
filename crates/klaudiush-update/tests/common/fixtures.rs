//! Archive, checksum and install fixtures
//!
//! Archives are built in memory. Tar entry names are written into the raw
//! header so fixtures can carry names the `tar` builder would refuse, such
//! as `../../etc/cron.d/evil`.

use flate2::write::GzEncoder;
use flate2::Compression;
use klaudiush_update::Platform;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use super::constants::*;

/// Platform whose archives are `.tar.gz`, independent of the host
pub fn linux_platform() -> Platform {
    Platform::new("linux", "amd64")
}

/// Build a `.tar.gz` holding regular files
pub fn tar_gz_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        let raw_name = &mut header.as_gnu_mut().unwrap().name;
        raw_name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a `.zip` holding regular files
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Write `content` to `dir/name`
pub fn write_fixture(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Checksums manifest covering `files`
pub fn checksums_manifest(files: &[(&str, &[u8])]) -> String {
    files
        .iter()
        .map(|(name, content)| format!("{}  {}\n", sha256_hex(content), name))
        .collect()
}

/// Place an executable fake install at `dir/<relative>/klaudiush`
pub fn fake_install(dir: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let bin_dir = dir.join(relative);
    fs::create_dir_all(&bin_dir).unwrap();
    let path = bin_dir.join(BINARY);
    fs::write(&path, content).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// `brew info --json=v2` output for the klaudiush formula
pub fn brew_info_json(installed: &str, stable: &str) -> String {
    format!(
        r#"{{"formulae":[{{"name":"klaudiush","full_name":"{}","versions":{{"stable":"{}","head":null}},"installed":[{{"version":"{}"}}]}}],"casks":[]}}"#,
        FORMULA, stable, installed
    )
}
