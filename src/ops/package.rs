//! Packaging: install, license and package metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::executor::StepFailure;
use crate::core::options::ResolvedOptions;
use crate::core::recipe::Recipe;
use crate::core::version::Version;
use crate::ops::evaluate::Evaluation;
use crate::util::fs::{copy_matching, write_string};

/// Metadata file written at the package root.
pub const PACKAGE_INFO_FILE: &str = "package-info.json";

/// What consumers need to know about an installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: Version,
    /// Package identity fingerprint
    pub identity: String,
    /// Options that participate in the identity
    pub options: ResolvedOptions,
    /// Search paths consumers should append
    pub env: BTreeMap<String, Vec<PathBuf>>,
}

impl PackageInfo {
    pub fn new(evaluation: &Evaluation) -> Self {
        let prefix = evaluation.package_dir();
        let mut env = BTreeMap::new();
        env.insert("PATH".to_string(), vec![prefix.join("bin")]);
        env.insert("MANPATH".to_string(), vec![prefix.join("share").join("man")]);

        PackageInfo {
            name: evaluation.name.clone(),
            version: evaluation.version.clone(),
            identity: evaluation.identity.id().to_string(),
            options: evaluation.identity.options().clone(),
            env,
        }
    }
}

/// Result of packaging.
#[derive(Debug, Clone)]
pub struct PackageResult {
    pub prefix: PathBuf,
    /// License files copied into the package
    pub licenses: Vec<PathBuf>,
    pub info: PathBuf,
}

/// Install the built tree, then add the license and package info.
pub fn package(evaluation: &Evaluation, recipe: &Recipe) -> Result<PackageResult> {
    let install = &evaluation.install;
    tracing::info!("{:>12} {}", "Installing", install.command);

    let output = install
        .command
        .to_process()
        .exec()
        .with_context(|| format!("failed to install into {}", install.prefix.display()))?;
    if !output.success() {
        return Err(StepFailure {
            index: evaluation.plan.len(),
            step: "install".to_string(),
            command: install.command.to_string(),
            code: output.code,
            output: output.combined(),
        }
        .into());
    }

    finish_package(evaluation, recipe)
}

/// Copy the license artifact and write the package info into the install prefix.
pub fn finish_package(evaluation: &Evaluation, recipe: &Recipe) -> Result<PackageResult> {
    let prefix = evaluation.package_dir().clone();
    let license_dir = licenses_dir(&prefix, recipe.name());

    let licenses = copy_matching(&evaluation.layout.source_dir, &recipe.layout.license, &license_dir)?;
    if licenses.is_empty() {
        tracing::warn!(
            "no license file matching `{}` in {}",
            recipe.layout.license,
            evaluation.layout.source_dir.display()
        );
    }

    let info = PackageInfo::new(evaluation);
    let json = serde_json::to_string_pretty(&info).context("failed to serialize package info")?;
    let info_path = prefix.join(PACKAGE_INFO_FILE);
    write_string(&info_path, &json)?;

    tracing::info!("{:>12} {} into {}", "Packaged", recipe.name(), prefix.display());

    Ok(PackageResult {
        prefix,
        licenses,
        info: info_path,
    })
}

/// `<prefix>/share/licenses/<name>`
pub fn licenses_dir(prefix: &Path, name: &str) -> PathBuf {
    prefix.join("share").join("licenses").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{BuildMode, CompilerIdentity, OsFamily, PlatformDescriptor};
    use crate::ops::evaluate::{evaluate, EvaluateRequest};
    use tempfile::TempDir;

    fn evaluated(src: &Path) -> (Recipe, Evaluation) {
        let recipe = Recipe::builtin("sycl-info").unwrap().unwrap();
        let platform = PlatformDescriptor::new(
            OsFamily::Linux,
            CompilerIdentity::new("clang", Some("10")),
            "x86_64",
            BuildMode::Release,
        );
        let eval = evaluate(&recipe, &EvaluateRequest::new(src, platform)).unwrap();
        (recipe, eval)
    }

    #[test]
    fn test_finish_package() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("CMakeLists.txt"),
            "project(sycl-info VERSION 0.1 LANGUAGES CXX)\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("LICENSES.TXT"), "Apache License 2.0").unwrap();

        let (recipe, eval) = evaluated(tmp.path());
        let result = finish_package(&eval, &recipe).unwrap();

        let license = licenses_dir(&result.prefix, "sycl-info").join("LICENSES.TXT");
        assert_eq!(result.licenses, vec![license.clone()]);
        assert_eq!(std::fs::read_to_string(license).unwrap(), "Apache License 2.0");

        let info: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&result.info).unwrap()).unwrap();
        assert_eq!(info["name"], "sycl-info");
        assert_eq!(info["version"], "0.1");
        assert_eq!(info["identity"], eval.identity.id());
        assert!(info["options"].get("build_testing").is_none());
        assert_eq!(
            info["env"]["MANPATH"][0],
            result.prefix.join("share/man").display().to_string()
        );
        assert_eq!(
            info["env"]["PATH"][0],
            result.prefix.join("bin").display().to_string()
        );
    }

    #[test]
    fn test_missing_license_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let (recipe, eval) = evaluated(tmp.path());

        let result = finish_package(&eval, &recipe).unwrap();
        assert!(result.licenses.is_empty());
        assert!(result.info.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_install_failure_is_step_failure() {
        use crate::builder::plan::StepCommand;

        let tmp = TempDir::new().unwrap();
        let (recipe, mut eval) = evaluated(tmp.path());
        eval.install.command = StepCommand::new("sh")
            .arg("-c")
            .arg("echo 'cannot write prefix' >&2; exit 3");

        let err = package(&eval, &recipe).unwrap_err();
        let failure = err.downcast_ref::<StepFailure>().unwrap();
        assert_eq!(failure.step, "install");
        assert_eq!(failure.index, eval.plan.len());
        assert_eq!(failure.code, Some(3));
        assert!(failure.output.contains("cannot write prefix"));
        assert!(!eval.package_dir().join(PACKAGE_INFO_FILE).exists());
    }
}
