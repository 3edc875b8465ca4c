//! Foundry - package recipe evaluation and build orchestration
//!
//! This crate evaluates a package recipe against a requested configuration
//! and target platform, plans the native CMake build, and runs and packages
//! it.

pub mod builder;
pub mod core;
pub mod ops;
pub mod system;
pub mod util;

pub use builder::{BuildLayout, BuildPlan};
pub use core::{
    identity::PackageIdentity, options::ResolvedOptions, platform::PlatformDescriptor,
    recipe::Recipe, version::Version,
};
pub use ops::{EvaluateRequest, Evaluation};
pub use util::config::Config;
