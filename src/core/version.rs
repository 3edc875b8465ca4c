//! Project version extraction from the build-description file.
//!
//! The version is read from the first `project(<name> VERSION <token>`
//! declaration in `CMakeLists.txt`. A missing file, a missing declaration or
//! an empty token all resolve to [`Version::Unknown`]; none of them is an
//! error.

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Serialize, Serializer};

/// The declared project version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Version {
    Known(String),
    #[default]
    Unknown,
}

impl Version {
    /// The version token, if one was found.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Version::Known(v) => Some(v),
            Version::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Version::Known(_))
    }

    /// Lenient semver view of the token (`1.2` reads as `1.2.0`).
    pub fn semver(&self) -> Option<semver::Version> {
        let token = self.as_str()?;
        if let Ok(v) = semver::Version::parse(token) {
            return Some(v);
        }

        let mut parts = token.split('.').map(|p| p.parse::<u64>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().unwrap_or(Ok(0)).ok()?;
        let patch = parts.next().unwrap_or(Ok(0)).ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(semver::Version::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Known(v) => write!(f, "{}", v),
            Version::Unknown => write!(f, "unknown version"),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Version::Known(v) => serializer.serialize_some(v),
            Version::Unknown => serializer.serialize_none(),
        }
    }
}

/// Extract the version declared for `project_name` from build-description text.
pub fn resolve_version(text: &str, project_name: &str) -> Version {
    let pattern = format!(
        r"project\({}\s+VERSION\s+([^\s\)]*)",
        regex::escape(project_name)
    );

    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!("version pattern for `{}` did not compile: {}", project_name, e);
            return Version::Unknown;
        }
    };

    let token = re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty());

    match token {
        Some(t) => Version::Known(t.to_string()),
        None => {
            tracing::debug!("no `project({} VERSION ...)` declaration found", project_name);
            Version::Unknown
        }
    }
}

/// Read `path` and extract the declared version; unreadable files resolve to `Unknown`.
pub fn resolve_version_file(path: &Path, project_name: &str) -> Version {
    match std::fs::read_to_string(path) {
        Ok(text) => resolve_version(&text, project_name),
        Err(e) => {
            tracing::debug!("could not read {}: {}", path.display(), e);
            Version::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolves_declared_version() {
        let text = "cmake_minimum_required(VERSION 3.10)\nproject(sycl-info VERSION 1.2.3)\n";
        assert_eq!(
            resolve_version(text, "sycl-info"),
            Version::Known("1.2.3".to_string())
        );
    }

    #[test]
    fn test_version_followed_by_languages() {
        let text = "project(sycl-info\n  VERSION 0.1.0 LANGUAGES CXX)";
        assert_eq!(resolve_version(text, "sycl-info").as_str(), Some("0.1.0"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let text = "project(sycl-info VERSION 2.0)\nproject(sycl-info VERSION 3.0)";
        assert_eq!(resolve_version(text, "sycl-info").as_str(), Some("2.0"));
    }

    #[test]
    fn test_missing_pattern_is_unknown() {
        assert_eq!(resolve_version("project(sycl-info)", "sycl-info"), Version::Unknown);
        assert_eq!(resolve_version("", "sycl-info"), Version::Unknown);
        assert_eq!(
            resolve_version("project(other VERSION 1.0)", "sycl-info"),
            Version::Unknown
        );
    }

    #[test]
    fn test_empty_token_is_unknown() {
        assert_eq!(
            resolve_version("project(sycl-info VERSION )", "sycl-info"),
            Version::Unknown
        );
    }

    #[test]
    fn test_name_is_matched_literally() {
        // `.` in a project name must not act as a wildcard
        assert_eq!(
            resolve_version("project(libXfoo VERSION 1.0)", "lib.foo"),
            Version::Unknown
        );
    }

    #[test]
    fn test_unreadable_file_is_unknown() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("CMakeLists.txt");
        assert_eq!(resolve_version_file(&missing, "sycl-info"), Version::Unknown);

        std::fs::write(&missing, "project(sycl-info VERSION 0.4.1)").unwrap();
        assert_eq!(
            resolve_version_file(&missing, "sycl-info").as_str(),
            Some("0.4.1")
        );
    }

    #[test]
    fn test_semver_view() {
        assert_eq!(
            Version::Known("1.2".to_string()).semver(),
            Some(semver::Version::new(1, 2, 0))
        );
        assert_eq!(
            Version::Known("1.2.3-rc1".to_string()).semver().map(|v| v.to_string()),
            Some("1.2.3-rc1".to_string())
        );
        assert_eq!(Version::Known("20190827a".to_string()).semver(), None);
        assert_eq!(Version::Unknown.semver(), None);
    }

    #[test]
    fn test_display_unknown() {
        assert_eq!(Version::Unknown.to_string(), "unknown version");
    }
}
