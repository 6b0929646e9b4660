//! Error types for klaudiush-update

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using klaudiush-update's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur during update operations
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The installed version is already the newest one.
    ///
    /// This is the expected terminal state of a check, not a failure.
    #[error("already on the latest version ({current})")]
    AlreadyLatest { current: String },

    // Version errors
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    #[error("Release {version} not found")]
    VersionNotFound { version: String },

    // Integrity errors
    #[error("SHA256 verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("No checksum entry for {file} in the checksums manifest")]
    ChecksumNotFound { file: String },

    // Archive errors
    #[error("Corrupt archive {path}: {message}")]
    ArchiveCorrupt { path: PathBuf, message: String },

    #[error("Binary {binary} not found in archive")]
    BinaryNotFoundInArchive { binary: String },

    #[error("Archive entry {entry} escapes the extraction directory")]
    PathTraversal { entry: String },

    // Package manager errors
    #[error(
        "Homebrew cannot install pinned version {version}; run 'brew upgrade' or use a direct install"
    )]
    BrewVersionPin { version: String },

    #[error("Unexpected Homebrew metadata: {message}")]
    BrewMetadata { message: String },

    // Process errors
    #[error("Failed to run {command}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed (exit code: {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // Detection errors
    #[error("No {binary} installation found on the search path")]
    NoInstallation { binary: String },

    #[error("Install detector is not configured")]
    DetectorRequired,

    // Network errors
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("HTTP request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Operation cancelled")]
    Cancelled,

    // File system errors
    #[error("{operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdateError {
    /// Create an already-latest marker
    pub fn already_latest(current: impl Into<String>) -> Self {
        Self::AlreadyLatest {
            current: current.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a version not found error
    pub fn version_not_found(version: impl Into<String>) -> Self {
        Self::VersionNotFound {
            version: version.into(),
        }
    }

    /// Create a corrupt archive error
    pub fn archive_corrupt(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ArchiveCorrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a Homebrew metadata error
    pub fn brew_metadata(message: impl Into<String>) -> Self {
        Self::BrewMetadata {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation that failed
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether this is the "nothing to do" marker rather than a failure
    pub fn is_already_latest(&self) -> bool {
        matches!(self, Self::AlreadyLatest { .. })
    }

    /// Whether this is the permanent Homebrew version-pinning limitation
    pub fn is_brew_version_pin(&self) -> bool {
        matches!(self, Self::BrewVersionPin { .. })
    }

    /// Whether this error signals a security violation
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::ChecksumMismatch { .. }
        )
    }

    /// Check if this error is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}

/// Attach the failing operation to `std::io::Error` results
pub trait IoResultExt<T> {
    fn io_context<F, S>(self, operation: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn io_context<F, S>(self, operation: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| UpdateError::io(operation(), source))
    }
}
