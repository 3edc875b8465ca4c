//! Plan executor.
//!
//! Steps run one at a time, to completion, in plan order. A failing
//! configure or build step stops the plan; a failing test step is reported
//! in the [`PlanReport`] so the caller can decide what it means.

use std::time::Instant;

use anyhow::{bail, Result};
use miette::Diagnostic as MietteDiagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::env::RunEnvironment;
use crate::builder::plan::{BuildPlan, BuildStep};
use crate::util::diagnostic::suggestions;
use crate::util::process::find_executable;

/// What a failing test step does to packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFailurePolicy {
    /// Stop before packaging
    #[default]
    Abort,
    /// Report the failure and package anyway
    Continue,
}

/// A configure, build or install step exited unsuccessfully.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{step} step (#{index}) failed with exit code {code:?}: `{command}`\n{output}")]
#[diagnostic(
    code(foundry::build::step_failed),
    help("run `foundry build --verbose` for more details")
)]
pub struct StepFailure {
    /// Zero-based position in the plan
    pub index: usize,
    pub step: String,
    pub command: String,
    pub code: Option<i32>,
    /// Captured stdout and stderr, verbatim
    pub output: String,
}

/// Result of the test step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    /// Testing is disabled
    #[default]
    NotRun,
    Passed,
    Failed {
        failed_tests: Vec<String>,
        output: String,
    },
}

impl TestOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed { .. })
    }
}

/// Summary of a successful plan run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanReport {
    /// Names of the steps that ran, in order
    pub completed: Vec<String>,
    pub test: TestOutcome,
}

/// Run `plan`, entering `run_env` for the test step only.
pub fn execute(plan: &BuildPlan, run_env: &RunEnvironment) -> Result<PlanReport> {
    let start = Instant::now();
    let mut report = PlanReport::default();

    for (index, step) in plan.iter().enumerate() {
        let cmd = step.command();
        if find_executable(&cmd.program).is_none() {
            bail!("`{}` not found in PATH\n{}", cmd.program, suggestions::NO_CMAKE);
        }

        tracing::info!("{:>12} {}", step_label(step), cmd);

        let output = if step.is_test() {
            let _scope = run_env.enter()?;
            cmd.to_process().exec()?
        } else {
            cmd.to_process().exec()?
        };
        report.completed.push(step.name().to_string());

        if step.is_test() {
            report.test = if output.success() {
                TestOutcome::Passed
            } else {
                let combined = output.combined();
                let failed_tests = parse_failed_tests(&combined);
                tracing::warn!("{} test(s) failed", failed_tests.len().max(1));
                TestOutcome::Failed {
                    failed_tests,
                    output: combined,
                }
            };
            continue;
        }

        if !output.success() {
            return Err(StepFailure {
                index,
                step: step.name().to_string(),
                command: cmd.to_string(),
                code: output.code,
                output: output.combined(),
            }
            .into());
        }
    }

    tracing::info!(
        "{:>12} {} step(s) in {:.2}s",
        "Finished",
        report.completed.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}

fn step_label(step: &BuildStep) -> &'static str {
    match step {
        BuildStep::Configure(_) => "Configuring",
        BuildStep::Build(_) => "Building",
        BuildStep::Test(_) => "Testing",
    }
}

/// Test names from ctest's "The following tests FAILED:" section.
pub fn parse_failed_tests(output: &str) -> Vec<String> {
    let re = match Regex::new(r"^\s*\d+\s+-\s+(\S+)\s+\(") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    output
        .lines()
        .skip_while(|line| !line.contains("The following tests FAILED:"))
        .skip(1)
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
