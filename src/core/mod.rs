//! Core data structures for Foundry.
//!
//! This module contains the recipe model and its pure evaluation pieces:
//! - Version extraction from the build description
//! - Option schema, overrides and platform pruning
//! - Requirement references and conditional planning
//! - Package identity
//! - Recipe parsing

pub mod errors;
pub mod identity;
pub mod options;
pub mod platform;
pub mod recipe;
pub mod requirement;
pub mod version;

pub use errors::ValidationError;
pub use identity::{identity, PackageIdentity};
pub use options::{OptionSchema, OptionValue, ResolvedOptions};
pub use platform::{BuildMode, CompilerIdentity, OsFamily, PlatformDescriptor};
pub use recipe::{find_recipe, Recipe, RECIPE_FILE};
pub use requirement::{RequirementKind, RequirementPlanner, RequirementSpec};
pub use version::Version;
