//! Implementation of `foundry build`.

use anyhow::{bail, Result};

use crate::builder::executor::{execute, PlanReport, TestFailurePolicy, TestOutcome};
use crate::core::recipe::Recipe;
use crate::ops::evaluate::Evaluation;
use crate::ops::package::{package, PackageResult};
use crate::system::DocsToolingPolicy;
use crate::util::config::Config;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs::ensure_dir;

/// Policies for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run the advised system package installer
    pub install_system_packages: bool,

    /// Prefix installer commands with `sudo`
    pub sudo: bool,

    /// Requested but unavailable documentation tooling
    pub docs_tooling: DocsToolingPolicy,

    /// Failing tests
    pub on_test_failure: TestFailurePolicy,

    /// Install and package after a successful build
    pub package: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            install_system_packages: true,
            sudo: false,
            docs_tooling: DocsToolingPolicy::default(),
            on_test_failure: TestFailurePolicy::default(),
            package: true,
        }
    }
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        BuildOptions {
            install_system_packages: config.install_system_packages(),
            sudo: config.use_sudo(),
            docs_tooling: config.docs_tooling_policy(),
            on_test_failure: config.test_failure_policy(),
            package: true,
        }
    }
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub report: PlanReport,
    pub package: Option<PackageResult>,
    /// Advisory problems that did not stop the build
    pub warnings: Vec<Diagnostic>,
}

/// Build an evaluated recipe.
pub fn build(recipe: &Recipe, evaluation: &Evaluation, opts: &BuildOptions) -> Result<BuildOutcome> {
    let mut warnings = prepare_system_packages(evaluation, opts)?;

    ensure_dir(&evaluation.layout.build_dir)?;
    let report = execute(&evaluation.plan, &evaluation.run_environment())?;

    if let TestOutcome::Failed { ref failed_tests, ref output } = report.test {
        let names = if failed_tests.is_empty() {
            "(unknown)".to_string()
        } else {
            failed_tests.join(", ")
        };

        match opts.on_test_failure {
            TestFailurePolicy::Abort => {
                bail!("tests failed: {}\n{}\n{}", names, output, suggestions::STEP_FAILED)
            }
            TestFailurePolicy::Continue => {
                tracing::warn!("tests failed: {}; packaging anyway", names);
                warnings.push(
                    Diagnostic::warning(format!("tests failed: {}", names))
                        .with_context("test.on-failure = \"continue\""),
                );
            }
        }
    }

    let package = if opts.package {
        Some(package(evaluation, recipe)?)
    } else {
        None
    };

    Ok(BuildOutcome {
        report,
        package,
        warnings,
    })
}

/// Install requested tooling, or decide that its absence is fatal.
fn prepare_system_packages(evaluation: &Evaluation, opts: &BuildOptions) -> Result<Vec<Diagnostic>> {
    let mut warnings = Vec::new();

    if evaluation.tooling_unplanned() {
        match opts.docs_tooling {
            DocsToolingPolicy::Require => bail!(
                "documentation tooling was requested but no installer is available for {}\n{}",
                evaluation.platform,
                suggestions::NO_PACKAGE_MANAGER
            ),
            DocsToolingPolicy::Warn => {
                tracing::warn!("documentation tooling unavailable; continuing");
            }
        }
    }

    for command in &evaluation.system_packages {
        if !opts.install_system_packages {
            warnings.push(
                Diagnostic::note(format!("system package `{}` was not installed", command.package))
                    .with_context(format!("run `{}`", command.display_command(opts.sudo))),
            );
            continue;
        }

        if let Err(e) = command.run(opts.sudo) {
            match opts.docs_tooling {
                DocsToolingPolicy::Require => {
                    return Err(e.context(format!("failed to install `{}`", command.package)))
                }
                DocsToolingPolicy::Warn => {
                    tracing::warn!("failed to install `{}`: {:#}", command.package, e);
                    warnings.push(
                        Diagnostic::warning(format!("failed to install `{}`", command.package))
                            .with_context(command.display_command(opts.sudo)),
                    );
                }
            }
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{BuildMode, CompilerIdentity, OsFamily, PlatformDescriptor};
    use crate::ops::evaluate::{evaluate, EvaluateRequest};
    use tempfile::TempDir;

    fn evaluated(src: &std::path::Path, overrides: &[&str]) -> (Recipe, Evaluation) {
        let recipe = Recipe::builtin("sycl-info").unwrap().unwrap();
        let platform = PlatformDescriptor::new(
            OsFamily::Linux,
            CompilerIdentity::new("gcc", None),
            "x86_64",
            BuildMode::Release,
        );
        let request = EvaluateRequest::new(src, platform).overrides(overrides);
        let eval = evaluate(&recipe, &request).unwrap();
        (recipe, eval)
    }

    #[test]
    fn test_docs_tooling_required_fails_before_building() {
        let tmp = TempDir::new().unwrap();
        let (recipe, eval) = evaluated(tmp.path(), &["build_docs=true"]);

        let err = build(&recipe, &eval, &BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("documentation tooling"));
        assert!(!eval.layout.build_dir.exists());
    }

    #[test]
    fn test_from_config() {
        let config: Config = toml::from_str(
            "[test]\non-failure = \"continue\"\n\n[system-packages]\ninstall = false\ndocs-tooling = \"warn\"\n",
        )
        .unwrap();

        let opts = BuildOptions::from_config(&config);
        assert_eq!(opts.on_test_failure, TestFailurePolicy::Continue);
        assert_eq!(opts.docs_tooling, DocsToolingPolicy::Warn);
        assert!(!opts.install_system_packages);
        assert!(!opts.sudo);
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::builder::plan::{BuildPlan, BuildStep, StepCommand};

        fn sh(script: &str) -> StepCommand {
            StepCommand::new("sh").arg("-c").arg(script)
        }

        /// Replace the CMake commands with shell scripts.
        fn scripted(eval: &mut Evaluation, test_script: &str) {
            eval.plan = BuildPlan {
                steps: vec![
                    BuildStep::Configure(sh("exit 0")),
                    BuildStep::Build(sh("exit 0")),
                    BuildStep::Test(sh(test_script)),
                ],
            };
            let prefix = eval.install.prefix.display().to_string();
            eval.install.command = sh(&format!("mkdir -p '{}/bin'", prefix));
        }

        #[test]
        fn test_warn_policy_builds_and_packages() {
            let tmp = TempDir::new().unwrap();
            let (recipe, mut eval) = evaluated(tmp.path(), &["build_docs=true", "build_testing=true"]);
            scripted(&mut eval, "exit 0");

            let opts = BuildOptions {
                docs_tooling: DocsToolingPolicy::Warn,
                ..BuildOptions::default()
            };
            let outcome = build(&recipe, &eval, &opts).unwrap();

            assert_eq!(outcome.report.test, TestOutcome::Passed);
            let package = outcome.package.unwrap();
            assert!(package.prefix.join("bin").is_dir());
            assert!(package.info.is_file());
        }

        #[test]
        fn test_failed_tests_abort_packaging() {
            let tmp = TempDir::new().unwrap();
            let (recipe, mut eval) = evaluated(tmp.path(), &["build_testing=true"]);
            scripted(&mut eval, "echo 'The following tests FAILED:'; echo '  1 - smoke (Failed)'; exit 8");

            let err = build(&recipe, &eval, &BuildOptions::default()).unwrap_err();
            assert!(err.to_string().contains("tests failed: smoke"));
            assert!(!eval.install.prefix.exists());
        }

        #[test]
        fn test_failed_tests_continue_policy() {
            let tmp = TempDir::new().unwrap();
            let (recipe, mut eval) = evaluated(tmp.path(), &["build_testing=true"]);
            scripted(&mut eval, "exit 8");

            let opts = BuildOptions {
                on_test_failure: TestFailurePolicy::Continue,
                ..BuildOptions::default()
            };
            let outcome = build(&recipe, &eval, &opts).unwrap();

            assert!(outcome.report.test.is_failed());
            assert!(outcome.package.is_some());
            assert_eq!(outcome.warnings.len(), 1);
            assert!(outcome.warnings[0].message.contains("(unknown)"));
        }
    }
}
