//! Self-update functionality for the klaudiush CLI
//!
//! Provides:
//! - Version checking against GitHub releases
//! - Direct self-update with SHA256 checksum verification
//! - Path-traversal-safe extraction from `.tar.gz` and `.zip` archives
//! - Atomic binary replacement that preserves permissions
//! - Discovery of every installed copy on the search path
//! - Delegation to Homebrew for package-manager installs

pub mod archive;
pub mod checksum;
pub mod config;
pub mod detect;
pub mod download;
pub mod error;
pub mod homebrew;
pub mod platform;
pub mod process;
pub mod releases;
pub mod replace;
pub mod updater;
pub mod version;

pub use archive::{ArchiveFormat, ExtractedBinary};
pub use checksum::{parse_checksums, verify_file_checksum};
pub use config::{NetworkConfig, UpdaterConfig};
pub use detect::{InstallDetector, InstallInfo, InstallMethod};
pub use download::{DownloadProgress, Downloader, Progress};
pub use error::{Result, UpdateError};
pub use homebrew::{BrewStatus, HomebrewDelegate};
pub use platform::Platform;
pub use process::{CommandOutput, CommandRunner, SystemRunner};
pub use releases::{GitHubReleases, Release, ReleaseSource};
pub use replace::replace_binary;
pub use updater::{CheckAllResult, InstallStatus, UpdateAllResult, UpdateResult, Updater};

/// Current CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the released executable
pub const BINARY_NAME: &str = "klaudiush";

/// GitHub repository owner
pub const REPO_OWNER: &str = "smykla-labs";

/// GitHub repository name
pub const REPO_NAME: &str = "klaudiush";
