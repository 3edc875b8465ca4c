//! High-level operations.
//!
//! This module contains the implementation of Foundry commands.

pub mod build;
pub mod evaluate;
pub mod package;

pub use build::{build, BuildOptions, BuildOutcome};
pub use evaluate::{evaluate, EvaluateRequest, Evaluation};
pub use package::{finish_package, package, PackageInfo, PackageResult, PACKAGE_INFO_FILE};
