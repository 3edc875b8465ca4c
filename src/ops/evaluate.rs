//! Recipe evaluation.
//!
//! Evaluation is pure apart from reading the build description and probing
//! the filesystem: version, options, requirements, system packages, build
//! plan and identity, in that order. Every validation error surfaces here,
//! before any external command runs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::builder::cmake::{BuildLayout, CMakeInvocation};
use crate::builder::env::RunEnvironment;
use crate::builder::plan::{BuildPlan, InstallStep};
use crate::core::identity::{identity, PackageIdentity};
use crate::core::options::ResolvedOptions;
use crate::core::platform::{OsFamily, PlatformDescriptor};
use crate::core::recipe::Recipe;
use crate::core::requirement::RequirementSpec;
use crate::core::version::Version;
use crate::system::InstallCommand;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Inputs for one evaluation.
#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    /// `name=value` option overrides
    pub overrides: Vec<String>,
    pub platform: PlatformDescriptor,
    pub layout: BuildLayout,
    /// CMake generator
    pub generator: Option<String>,
    /// Parallel build jobs
    pub jobs: Option<usize>,
}

impl EvaluateRequest {
    /// Request with default layout and no overrides.
    pub fn new(source_dir: &Path, platform: PlatformDescriptor) -> Self {
        EvaluateRequest {
            overrides: Vec::new(),
            platform,
            layout: BuildLayout::new(source_dir),
            generator: None,
            jobs: None,
        }
    }

    pub fn overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Self {
        self.overrides = overrides.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.layout.source_dir
    }
}

/// Everything decided for one recipe, configuration and platform.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub name: String,
    pub version: Version,
    pub platform: PlatformDescriptor,
    pub options: ResolvedOptions,
    pub requirements: Vec<RequirementSpec>,
    pub system_packages: Vec<InstallCommand>,
    /// Whether the recipe's system-package option is on
    pub tooling_requested: bool,
    pub plan: BuildPlan,
    pub install: InstallStep,
    pub identity: PackageIdentity,
    pub layout: BuildLayout,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

impl Evaluation {
    /// Runtime search paths for the test step.
    pub fn run_environment(&self) -> RunEnvironment {
        RunEnvironment::for_requirements(&self.requirements, &self.layout.deps_dir)
    }

    /// Requested tooling that no installer command covers.
    pub fn tooling_unplanned(&self) -> bool {
        self.tooling_requested && self.system_packages.is_empty()
    }

    pub fn package_dir(&self) -> &PathBuf {
        &self.layout.package_dir
    }
}

/// Evaluate `recipe` for `request`.
pub fn evaluate(recipe: &Recipe, request: &EvaluateRequest) -> Result<Evaluation> {
    let mut warnings = Vec::new();

    let version = recipe.version(request.source_dir());
    if !version.is_known() {
        tracing::debug!("version of `{}` is unknown", recipe.name());
    } else if version.semver().is_none() {
        tracing::debug!("version `{}` is not semver-like", version);
    }

    let overrides = recipe.schema.parse_overrides(&request.overrides)?;
    let options = recipe
        .schema
        .resolve_for_platform(&overrides, &request.platform)?;

    for name in overrides.keys().filter(|name| !options.contains(name)) {
        warnings.push(
            Diagnostic::warning(format!(
                "option `{}` is not available on {}; override ignored",
                name, request.platform.os
            ))
            .with_context(format!("platform: {}", request.platform)),
        );
    }

    let requirements = recipe.requirements.plan_requirements(&options)?;

    let (tooling_requested, system_packages) = match recipe.system_packages {
        Some(ref packages) => {
            let enabled = options.is_true(&packages.when);
            let commands = packages.advise(&request.platform, enabled);
            if enabled && commands.is_empty() {
                warnings.push(tooling_warning(&packages.when, &request.platform));
            }
            (enabled, commands)
        }
        None => (false, Vec::new()),
    };

    let invocation = CMakeInvocation::new(
        recipe,
        &version,
        &options,
        &request.platform,
        &request.layout,
    )
    .generator(request.generator.clone())
    .jobs(request.jobs);
    let plan = invocation.build_plan();
    let install = invocation.install_step();

    let identity = identity(&options, &recipe.identity_exclusions);

    tracing::debug!(
        "evaluated {} {} for {}: {} requirement(s), {} step(s), identity {}",
        recipe.name(),
        version,
        request.platform,
        requirements.len(),
        plan.len(),
        identity
    );

    Ok(Evaluation {
        name: recipe.name().to_string(),
        version,
        platform: request.platform.clone(),
        options,
        requirements,
        system_packages,
        tooling_requested,
        plan,
        install,
        identity,
        layout: request.layout.clone(),
        warnings,
    })
}

fn tooling_warning(option: &str, platform: &PlatformDescriptor) -> Diagnostic {
    let reason = match platform.package_manager {
        _ if platform.os != OsFamily::Linux => {
            format!("no system package installer for {}", platform.os)
        }
        Some(manager) => format!("no system package is declared for {}", manager),
        None => "no package manager detected".to_string(),
    };

    Diagnostic::warning(format!("`{}` needs system tooling that cannot be installed", option))
        .with_context(reason)
        .with_context(format!("platform: {}", platform))
        .with_suggestion(suggestions::NO_PACKAGE_MANAGER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ValidationError;
    use crate::core::platform::{BuildMode, CompilerIdentity};
    use crate::core::requirement::RequirementKind;
    use crate::system::PackageManager;
    use tempfile::TempDir;

    fn recipe() -> Recipe {
        Recipe::builtin("sycl-info").unwrap().unwrap()
    }

    fn source_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.4.3)\nproject(sycl-info VERSION 0.1 LANGUAGES CXX)\n",
        )
        .unwrap();
        tmp
    }

    fn linux(manager: Option<PackageManager>) -> PlatformDescriptor {
        PlatformDescriptor::new(
            OsFamily::Linux,
            CompilerIdentity::new("gcc", Some("9")),
            "x86_64",
            BuildMode::Release,
        )
        .with_package_manager(manager)
    }

    #[test]
    fn test_testing_build_on_apt_linux() {
        let src = source_tree();
        let request = EvaluateRequest::new(src.path(), linux(Some(PackageManager::Apt)))
            .overrides(&["build_testing=True", "build_docs=False", "clang_tidy=False"]);

        let eval = evaluate(&recipe(), &request).unwrap();

        assert_eq!(eval.version.as_str(), Some("0.1"));

        let refs: Vec<String> = eval.requirements.iter().map(|r| r.reference()).collect();
        assert_eq!(
            refs,
            vec![
                "khronos-opencl-icd-loader/20190827@bincrafters/stable",
                "lyra/1.1.0",
                "jsonformoderncpp/3.7.2@vthiery/stable",
                "doctest/2.3.4@bincrafters/stable",
            ]
        );
        assert_eq!(eval.requirements[3].kind, RequirementKind::BuildTime);

        assert!(eval.system_packages.is_empty());
        assert!(!eval.tooling_requested);

        assert_eq!(eval.plan.len(), 3);
        assert!(eval.plan.steps[2].is_test());

        let id = eval.identity.options();
        assert!(!id.contains("build_testing"));
        assert!(!id.contains("clang_tidy"));
        assert!(!id.contains("clang_tidy_werror"));
        assert!(id.contains("build_docs"));
        assert!(id.contains("fPIC"));

        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_docs_on_yum_plans_one_command() {
        let src = source_tree();
        let request = EvaluateRequest::new(src.path(), linux(Some(PackageManager::Yum)))
            .overrides(&["build_docs=true"]);

        let eval = evaluate(&recipe(), &request).unwrap();
        assert_eq!(eval.system_packages.len(), 1);
        assert_eq!(eval.system_packages[0].package, "rubygem-ronn");
        assert!(!eval.tooling_unplanned());
    }

    #[test]
    fn test_docs_without_manager_warns() {
        let src = source_tree();
        let request = EvaluateRequest::new(src.path(), linux(None)).overrides(&["build_docs=true"]);

        let eval = evaluate(&recipe(), &request).unwrap();
        assert!(eval.system_packages.is_empty());
        assert!(eval.tooling_unplanned());
        assert_eq!(eval.warnings.len(), 1);
        assert!(eval.warnings[0].context[0].contains("no package manager detected"));
    }

    #[test]
    fn test_windows_drops_fpic_override() {
        let src = source_tree();
        let mut platform = linux(None);
        platform.os = OsFamily::Windows;
        let request = EvaluateRequest::new(src.path(), platform).overrides(&["fPIC=true"]);

        let eval = evaluate(&recipe(), &request).unwrap();
        assert!(!eval.options.contains("fPIC"));
        assert!(!eval.identity.options().contains("fPIC"));
        assert!(eval.warnings[0].message.contains("fPIC"));
    }

    #[test]
    fn test_docs_on_windows_ignores_host_manager() {
        let src = source_tree();
        let mut platform = linux(Some(PackageManager::Apt));
        platform.apply_setting("os", "windows").unwrap();
        let request = EvaluateRequest::new(src.path(), platform).overrides(&["build_docs=true"]);

        let eval = evaluate(&recipe(), &request).unwrap();
        assert!(eval.system_packages.is_empty());
        assert!(eval.tooling_unplanned());
        assert!(eval.warnings[0].context[0].contains("windows"));
    }

    #[test]
    fn test_unknown_version_still_evaluates() {
        let tmp = TempDir::new().unwrap();
        let request = EvaluateRequest::new(tmp.path(), linux(None));

        let eval = evaluate(&recipe(), &request).unwrap();
        assert_eq!(eval.version, Version::Unknown);
        assert_eq!(eval.plan.len(), 2);
    }

    #[test]
    fn test_unknown_option_is_validation_error() {
        let src = source_tree();
        let request = EvaluateRequest::new(src.path(), linux(None)).overrides(&["with_docs=true"]);

        let err = evaluate(&recipe(), &request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_identity_ignores_testing_and_lint() {
        let src = source_tree();
        let plain = evaluate(&recipe(), &EvaluateRequest::new(src.path(), linux(None))).unwrap();
        let linted = evaluate(
            &recipe(),
            &EvaluateRequest::new(src.path(), linux(None))
                .overrides(&["build_testing=true", "clang_tidy=true", "clang_tidy_werror=true"]),
        )
        .unwrap();

        assert_eq!(plain.identity, linted.identity);
        assert_ne!(plain.plan, linted.plan);
    }

    #[test]
    fn test_evaluation_serializes() {
        let src = source_tree();
        let eval = evaluate(&recipe(), &EvaluateRequest::new(src.path(), linux(None))).unwrap();
        let json = serde_json::to_value(&eval).unwrap();

        assert_eq!(json["name"], "sycl-info");
        assert_eq!(json["version"], "0.1");
        assert_eq!(json["plan"]["steps"][0]["type"], "configure");
        assert!(json.get("warnings").is_none());
    }
}
