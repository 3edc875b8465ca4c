//! Configuration file support for Foundry.
//!
//! Foundry reads two configuration files:
//! - Global: `~/.foundry/config.toml` - User-wide defaults
//! - Project: `.foundry/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::executor::TestFailurePolicy;
use crate::system::DocsToolingPolicy;

/// Foundry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Native build settings
    pub build: BuildConfig,

    /// Test step settings
    pub test: TestConfig,

    /// System package installation settings
    pub system_packages: SystemPackagesConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// CMake generator (e.g. "Ninja"); CMake picks its default when unset
    pub generator: Option<String>,

    /// Parallel jobs passed to `cmake --build --parallel`
    pub jobs: Option<usize>,

    /// Build directory, relative to the source tree
    pub build_dir: Option<PathBuf>,
}

/// Test step configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TestConfig {
    /// What a failing test step does to packaging
    pub on_failure: Option<TestFailurePolicy>,
}

/// System package configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SystemPackagesConfig {
    /// Run the advised installer command (default: true)
    pub install: Option<bool>,

    /// Prefix the installer command with `sudo` (default: false)
    pub sudo: Option<bool>,

    /// Whether missing documentation tooling fails the build
    pub docs_tooling: Option<DocsToolingPolicy>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.build_dir.is_some() {
            self.build.build_dir = other.build.build_dir;
        }

        if other.test.on_failure.is_some() {
            self.test.on_failure = other.test.on_failure;
        }

        if other.system_packages.install.is_some() {
            self.system_packages.install = other.system_packages.install;
        }
        if other.system_packages.sudo.is_some() {
            self.system_packages.sudo = other.system_packages.sudo;
        }
        if other.system_packages.docs_tooling.is_some() {
            self.system_packages.docs_tooling = other.system_packages.docs_tooling;
        }
    }

    pub fn test_failure_policy(&self) -> TestFailurePolicy {
        self.test.on_failure.unwrap_or_default()
    }

    pub fn docs_tooling_policy(&self) -> DocsToolingPolicy {
        self.system_packages.docs_tooling.unwrap_or_default()
    }

    pub fn install_system_packages(&self) -> bool {
        self.system_packages.install.unwrap_or(true)
    }

    pub fn use_sudo(&self) -> bool {
        self.system_packages.sudo.unwrap_or(false)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.foundry/config.toml)
/// 2. Global config (~/.foundry/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global foundry config directory (~/.foundry).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".foundry"))
}

/// Get the global config path (~/.foundry/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.foundry/config.toml).
pub fn project_config_path(source_dir: &Path) -> PathBuf {
    source_dir.join(".foundry").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.build.generator.is_none());
        assert_eq!(config.test_failure_policy(), TestFailurePolicy::Abort);
        assert_eq!(config.docs_tooling_policy(), DocsToolingPolicy::Require);
        assert!(config.install_system_packages());
        assert!(!config.use_sudo());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
generator = "Ninja"
jobs = 8

[test]
on-failure = "continue"

[system-packages]
sudo = true
docs-tooling = "warn"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.build.generator.as_deref(), Some("Ninja"));
        assert_eq!(config.build.jobs, Some(8));
        assert_eq!(config.test_failure_policy(), TestFailurePolicy::Continue);
        assert!(config.use_sudo());
        assert_eq!(config.docs_tooling_policy(), DocsToolingPolicy::Warn);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.generator = Some("Unix Makefiles".to_string());
        base.build.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.build.generator = Some("Ninja".to_string());

        base.merge(override_cfg);

        assert_eq!(base.build.generator.as_deref(), Some("Ninja"));
        assert_eq!(base.build.jobs, Some(4));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[build]\njobs = 2\n\n[system-packages]\ninstall = false\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[build]\njobs = 16\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.build.jobs, Some(16));
        assert!(!config.install_system_packages());
    }

    #[test]
    fn test_broken_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build\njobs = ").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.build.jobs.is_none());
    }
}
