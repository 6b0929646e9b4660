//! Version information for the klaudiush CLI

use klaudiush_update::Platform;
use serde::Serialize;

/// Version information
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,

    /// Git commit SHA (short)
    pub commit: Option<String>,

    /// Release platform, as used in archive names
    pub platform: String,
}

impl VersionInfo {
    /// Create version info for current build
    pub fn current() -> Self {
        Self {
            version: klaudiush_update::VERSION.to_string(),
            commit: option_env!("GIT_SHA").map(String::from),
            platform: Platform::current().to_string(),
        }
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut parts = vec![format!("klaudiush {}", self.version)];

        if let Some(commit) = &self.commit {
            parts.push(format!("({})", commit));
        }

        parts.push(self.platform.clone());
        parts.join(" ")
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_contains_version_and_platform() {
        let info = VersionInfo::current();
        let display = info.display();

        assert!(display.starts_with("klaudiush "));
        assert!(display.contains(&info.version));
        assert!(display.ends_with(&info.platform));
    }

    #[test]
    fn test_display_is_parseable_by_version_query() {
        let info = VersionInfo::current();
        let parsed = klaudiush_update::version::extract_version(&info.display());
        assert_eq!(parsed.map(|v| v.to_string()), Some(info.version));
    }
}
