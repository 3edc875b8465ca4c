//! System package advice.
//!
//! Some recipe options need a tool that only the OS package manager can
//! provide (the man-page renderer behind `build_docs`, for instance). The
//! advisor picks exactly one installer command for the detected package
//! manager. It never installs anything by itself; [`InstallCommand::run`] is
//! the single, explicit installation call.

mod detect;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;
use crate::core::platform::{OsFamily, PlatformDescriptor};
use crate::util::process::ProcessBuilder;

pub use detect::parse_os_release;

/// Native package managers Foundry knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pacman,
    Yum,
    Apt,
}

impl PackageManager {
    /// Detection priority; the first match wins.
    pub const PRIORITY: [PackageManager; 3] =
        [PackageManager::Pacman, PackageManager::Yum, PackageManager::Apt];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Pacman => "pacman",
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt",
        }
    }

    fn install_program(&self) -> &'static str {
        match self {
            PackageManager::Pacman => "pacman",
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt-get",
        }
    }

    /// Installer arguments that precede the package name.
    fn install_flags(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Pacman => &["-S", "--noconfirm", "--needed"],
            PackageManager::Yum => &["install", "-y"],
            PackageManager::Apt => &["install", "-y", "--no-install-recommends"],
        }
    }

    /// Distribution IDs (from os-release `ID`/`ID_LIKE`) served by this manager.
    fn distributions(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Pacman => &["arch", "manjaro", "endeavouros", "artix"],
            PackageManager::Yum => &[
                "centos", "rhel", "redhat", "fedora", "pidora", "amzn", "ol", "rocky", "almalinux",
            ],
            PackageManager::Apt => &[
                "debian", "ubuntu", "knoppix", "linuxmint", "raspbian", "neon", "pop", "elementary",
            ],
        }
    }

    /// Detect the host package manager.
    ///
    /// Reads `/etc/os-release` first and falls back to probing PATH for the
    /// installer programs, both in [`PackageManager::PRIORITY`] order.
    pub fn detect() -> Option<Self> {
        detect::detect_host()
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManager {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pacman" => Ok(PackageManager::Pacman),
            "yum" | "dnf" => Ok(PackageManager::Yum),
            "apt" | "apt-get" => Ok(PackageManager::Apt),
            _ => Err(ValidationError::InvalidSetting {
                setting: "package_manager".to_string(),
                value: s.to_string(),
                expected: "one of pacman, yum, apt, none".to_string(),
            }),
        }
    }
}

/// Whether missing documentation tooling fails a build that asked for docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocsToolingPolicy {
    /// Fail before the native build starts
    #[default]
    Require,
    /// Report a warning and continue
    Warn,
}

/// A single installer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallCommand {
    pub manager: PackageManager,
    pub package: String,
    pub program: String,
    pub args: Vec<String>,
}

impl InstallCommand {
    fn new(manager: PackageManager, package: &str) -> Self {
        let mut args: Vec<String> = manager
            .install_flags()
            .iter()
            .map(|a| a.to_string())
            .collect();
        args.push(package.to_string());

        InstallCommand {
            manager,
            package: package.to_string(),
            program: manager.install_program().to_string(),
            args,
        }
    }

    fn to_process(&self, sudo: bool) -> ProcessBuilder {
        if sudo {
            ProcessBuilder::new("sudo").arg(&self.program).args(&self.args)
        } else {
            ProcessBuilder::new(&self.program).args(&self.args)
        }
    }

    /// The command line as it will be run.
    pub fn display_command(&self, sudo: bool) -> String {
        self.to_process(sudo).display_command()
    }

    /// Run the installer. A nonzero exit is returned as an error for the
    /// caller to downgrade or escalate.
    pub fn run(&self, sudo: bool) -> Result<()> {
        tracing::info!("Installing system package `{}` with {}", self.package, self.manager);
        self.to_process(sudo).exec_and_check()?;
        Ok(())
    }
}

/// Per-manager package names for one optional tool, gated on an option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SystemPackages {
    /// Boolean option that enables the tool
    pub when: String,
    #[serde(default)]
    pub pacman: Option<String>,
    #[serde(default)]
    pub yum: Option<String>,
    #[serde(default)]
    pub apt: Option<String>,
}

impl SystemPackages {
    /// The package name for `manager`, if the recipe declares one.
    pub fn package_for(&self, manager: PackageManager) -> Option<&str> {
        match manager {
            PackageManager::Pacman => self.pacman.as_deref(),
            PackageManager::Yum => self.yum.as_deref(),
            PackageManager::Apt => self.apt.as_deref(),
        }
    }

    /// Installer commands for `platform`.
    ///
    /// Empty when `enabled` is false, when the target is not Linux, when no
    /// package manager was detected, or when the recipe has no package name
    /// for the detected manager.
    pub fn advise(&self, platform: &PlatformDescriptor, enabled: bool) -> Vec<InstallCommand> {
        if !enabled {
            return Vec::new();
        }

        if platform.os != OsFamily::Linux {
            tracing::debug!("no system package installer for {}", platform.os);
            return Vec::new();
        }

        let Some(manager) = platform.package_manager else {
            tracing::debug!("no package manager detected for {}", platform.os);
            return Vec::new();
        };

        match self.package_for(manager) {
            Some(package) => vec![InstallCommand::new(manager, package)],
            None => {
                tracing::debug!("no `{}` package declared for {}", self.when, manager);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{BuildMode, CompilerIdentity};

    fn ronn() -> SystemPackages {
        SystemPackages {
            when: "build_docs".to_string(),
            pacman: Some("ruby-ronn".to_string()),
            yum: Some("rubygem-ronn".to_string()),
            apt: Some("ruby-ronn".to_string()),
        }
    }

    fn platform(manager: Option<PackageManager>) -> PlatformDescriptor {
        PlatformDescriptor::new(
            OsFamily::Linux,
            CompilerIdentity::new("gcc", None),
            "x86_64",
            BuildMode::Release,
        )
        .with_package_manager(manager)
    }

    #[test]
    fn test_disabled_is_always_empty() {
        for manager in [None, Some(PackageManager::Pacman), Some(PackageManager::Yum), Some(PackageManager::Apt)] {
            assert!(ronn().advise(&platform(manager), false).is_empty());
        }
    }

    #[test]
    fn test_one_command_per_manager() {
        let yum = ronn().advise(&platform(Some(PackageManager::Yum)), true);
        assert_eq!(yum.len(), 1);
        assert_eq!(yum[0].package, "rubygem-ronn");
        assert_eq!(yum[0].display_command(false), "yum install -y rubygem-ronn");

        let apt = ronn().advise(&platform(Some(PackageManager::Apt)), true);
        assert_eq!(
            apt[0].display_command(true),
            "sudo apt-get install -y --no-install-recommends ruby-ronn"
        );

        let pacman = ronn().advise(&platform(Some(PackageManager::Pacman)), true);
        assert_eq!(pacman[0].args, vec!["-S", "--noconfirm", "--needed", "ruby-ronn"]);
    }

    #[test]
    fn test_non_linux_target_is_empty() {
        let mut windows = platform(Some(PackageManager::Apt));
        windows.os = OsFamily::Windows;
        assert!(ronn().advise(&windows, true).is_empty());

        let mut macos = platform(Some(PackageManager::Pacman));
        macos.os = OsFamily::Macos;
        assert!(ronn().advise(&macos, true).is_empty());
    }

    #[test]
    fn test_no_manager_is_empty() {
        assert!(ronn().advise(&platform(None), true).is_empty());
    }

    #[test]
    fn test_missing_package_name_is_empty() {
        let apt_only = SystemPackages {
            when: "build_docs".to_string(),
            apt: Some("ruby-ronn".to_string()),
            ..SystemPackages::default()
        };
        assert!(apt_only
            .advise(&platform(Some(PackageManager::Pacman)), true)
            .is_empty());
    }

    #[test]
    fn test_parse_manager() {
        assert_eq!("dnf".parse::<PackageManager>().unwrap(), PackageManager::Yum);
        assert_eq!("APT".parse::<PackageManager>().unwrap(), PackageManager::Apt);
        assert!("brew".parse::<PackageManager>().is_err());
    }
}
