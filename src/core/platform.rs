//! Target platform descriptor (the recipe "settings").
//!
//! A [`PlatformDescriptor`] is supplied by the caller, or detected for the
//! host and then adjusted with `key=value` settings. It is passed through
//! unchanged for the whole evaluation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::core::errors::ValidationError;
use crate::system::PackageManager;
use crate::util::process::{find_cxx_compiler, ProcessBuilder};

/// Operating system family of the build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Windows,
    FreeBsd,
}

impl OsFamily {
    /// The family of the running host.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::Macos,
            "freebsd" => OsFamily::FreeBsd,
            _ => OsFamily::Linux,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
            OsFamily::Windows => "windows",
            OsFamily::FreeBsd => "freebsd",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OsFamily::Linux),
            "macos" | "darwin" | "osx" => Ok(OsFamily::Macos),
            "windows" => Ok(OsFamily::Windows),
            "freebsd" => Ok(OsFamily::FreeBsd),
            _ => Err(ValidationError::InvalidSetting {
                setting: "os".to_string(),
                value: s.to_string(),
                expected: "one of linux, macos, windows, freebsd".to_string(),
            }),
        }
    }
}

/// CMake build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BuildMode {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildMode {
    /// Name as understood by `CMAKE_BUILD_TYPE` and `--config`.
    pub const fn as_cmake(&self) -> &'static str {
        match self {
            BuildMode::Debug => "Debug",
            BuildMode::Release => "Release",
            BuildMode::RelWithDebInfo => "RelWithDebInfo",
            BuildMode::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cmake())
    }
}

impl FromStr for BuildMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildMode::Debug),
            "release" => Ok(BuildMode::Release),
            "relwithdebinfo" => Ok(BuildMode::RelWithDebInfo),
            "minsizerel" => Ok(BuildMode::MinSizeRel),
            _ => Err(ValidationError::InvalidSetting {
                setting: "build_type".to_string(),
                value: s.to_string(),
                expected: "one of Debug, Release, RelWithDebInfo, MinSizeRel".to_string(),
            }),
        }
    }
}

/// Compiler identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerIdentity {
    /// Compiler family (gcc, clang, apple-clang, msvc)
    pub family: String,
    /// Compiler version, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CompilerIdentity {
    pub fn new(family: &str, version: Option<&str>) -> Self {
        CompilerIdentity {
            family: family.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// Detect the host C++ compiler.
    ///
    /// Falls back to an `unknown` family when no compiler is on PATH, since
    /// the compiler only matters to the native backend, which finds its own.
    pub fn host(os: OsFamily) -> Self {
        let Some(path) = find_cxx_compiler() else {
            tracing::debug!("no C++ compiler found on PATH");
            return CompilerIdentity::new("unknown", None);
        };

        let family = compiler_family(&path, os);
        let version = if family == "msvc" {
            None
        } else {
            ProcessBuilder::new(&path)
                .arg("-dumpversion")
                .exec()
                .ok()
                .filter(|out| out.success())
                .map(|out| out.stdout.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        CompilerIdentity {
            family: family.to_string(),
            version,
        }
    }
}

impl fmt::Display for CompilerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}-{}", self.family, v),
            None => write!(f, "{}", self.family),
        }
    }
}

/// Guess the compiler family from its executable name.
fn compiler_family(path: &Path, os: OsFamily) -> &'static str {
    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if name == "cl" {
        "msvc"
    } else if name.contains("clang") || (name == "c++" && os == OsFamily::Macos) {
        if os == OsFamily::Macos {
            "apple-clang"
        } else {
            "clang"
        }
    } else {
        "gcc"
    }
}

/// Target environment for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformDescriptor {
    pub os: OsFamily,
    pub compiler: CompilerIdentity,
    pub arch: String,
    pub build_mode: BuildMode,
    /// Native package manager available on the target, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,
}

impl PlatformDescriptor {
    pub fn new(os: OsFamily, compiler: CompilerIdentity, arch: &str, build_mode: BuildMode) -> Self {
        PlatformDescriptor {
            os,
            compiler,
            arch: arch.to_string(),
            build_mode,
            package_manager: None,
        }
    }

    /// Set the package manager family.
    pub fn with_package_manager(mut self, manager: Option<PackageManager>) -> Self {
        self.package_manager = manager;
        self
    }

    /// Describe the running host.
    pub fn host() -> Self {
        let os = OsFamily::host();
        let manager = if os == OsFamily::Linux {
            PackageManager::detect()
        } else {
            None
        };

        PlatformDescriptor::new(
            os,
            CompilerIdentity::host(os),
            std::env::consts::ARCH,
            BuildMode::default(),
        )
        .with_package_manager(manager)
    }

    /// Apply one `key=value` setting.
    ///
    /// Recognised keys: `os`, `compiler`, `compiler.version`, `arch`,
    /// `build_type`, `package_manager` (`none` clears it).
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), ValidationError> {
        match key {
            "os" => self.os = value.parse()?,
            "compiler" => self.compiler = CompilerIdentity::new(value, None),
            "compiler.version" => self.compiler.version = Some(value.to_string()),
            "arch" => self.arch = value.to_string(),
            "build_type" => self.build_mode = value.parse()?,
            "package_manager" => {
                self.package_manager = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            _ => {
                return Err(ValidationError::InvalidSetting {
                    setting: key.to_string(),
                    value: value.to_string(),
                    expected: "a setting named os, compiler, compiler.version, arch, build_type or package_manager"
                        .to_string(),
                })
            }
        }
        Ok(())
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {} {}",
            self.arch, self.os, self.compiler, self.build_mode
        )
    }
}
