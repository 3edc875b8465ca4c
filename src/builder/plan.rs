//! Build plan types.
//!
//! A BuildPlan is the ordered list of native build-tool invocations for one
//! evaluation: configure, build and, when testing is enabled, test. The
//! install invocation is kept apart in [`InstallStep`] because it belongs to
//! packaging, not to building.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::process::ProcessBuilder;

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Environment variables set for this command only
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl StepCommand {
    pub fn new(program: &str) -> Self {
        StepCommand {
            program: program.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Whether `arg` appears verbatim in the argument list.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    pub fn to_process(&self) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.program).args(&self.args);
        for (key, value) in &self.env {
            pb = pb.env(key, value);
        }
        if let Some(ref cwd) = self.cwd {
            pb = pb.cwd(cwd);
        }
        pb
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_process().display_command())
    }
}

/// A step in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildStep {
    /// Generate the native build system
    Configure(StepCommand),
    /// Compile and link
    Build(StepCommand),
    /// Run the project's test suite
    Test(StepCommand),
}

impl BuildStep {
    pub fn name(&self) -> &'static str {
        match self {
            BuildStep::Configure(_) => "configure",
            BuildStep::Build(_) => "build",
            BuildStep::Test(_) => "test",
        }
    }

    pub fn command(&self) -> &StepCommand {
        match self {
            BuildStep::Configure(cmd) | BuildStep::Build(cmd) | BuildStep::Test(cmd) => cmd,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, BuildStep::Test(_))
    }
}

/// Ordered build steps. Always configure then build, with test last when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
}

impl BuildPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn has_test(&self) -> bool {
        self.steps.iter().any(BuildStep::is_test)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildStep> {
        self.steps.iter()
    }
}

/// The install invocation used by packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStep {
    pub command: StepCommand,
    /// Install prefix
    pub prefix: PathBuf,
}
