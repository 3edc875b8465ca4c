//! Native build orchestration.
//!
//! This module turns an evaluation into CMake invocations and runs them.

pub mod cmake;
pub mod env;
pub mod executor;
pub mod plan;

pub use cmake::{BuildLayout, CMakeInvocation, TESTING_OPTION};
pub use env::{EnvScope, RunEnvironment};
pub use executor::{execute, PlanReport, StepFailure, TestFailurePolicy, TestOutcome};
pub use plan::{BuildPlan, BuildStep, InstallStep, StepCommand};
