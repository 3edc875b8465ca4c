//! Foundry.toml recipe parsing and schema.
//!
//! A recipe declares everything Foundry needs to evaluate one package:
//! metadata, options, pruning rules, requirements, system packages, the CMake
//! names of the options, and which options stay out of the package identity.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;
use crate::core::options::{
    OptionDefinition, OptionDomain, OptionSchema, OptionValue, PruneRule,
};
use crate::core::platform::OsFamily;
use crate::core::requirement::{
    ConditionalRequirement, RequirementKind, RequirementPlanner, RequirementSpec,
};
use crate::core::version::{resolve_version_file, Version};
use crate::system::SystemPackages;

/// Canonical recipe file name.
pub const RECIPE_FILE: &str = "Foundry.toml";

const SYCL_INFO_RECIPE: &str = include_str!("../../recipes/sycl-info/Foundry.toml");

/// Names of the recipes compiled into the binary.
pub const BUILTIN_RECIPES: &[&str] = &["sycl-info"];

/// Package metadata from the [package] section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeMetadata {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,
}

/// Where the recipe finds its inputs inside the source tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RecipeLayout {
    /// File the project version is read from
    #[serde(default = "default_build_description")]
    pub build_description: PathBuf,

    /// Glob for the license artifact copied into the package
    #[serde(default = "default_license")]
    pub license: String,
}

fn default_build_description() -> PathBuf {
    PathBuf::from("CMakeLists.txt")
}

fn default_license() -> String {
    "LICENSE*".to_string()
}

impl Default for RecipeLayout {
    fn default() -> Self {
        RecipeLayout {
            build_description: default_build_description(),
            license: default_license(),
        }
    }
}

/// A parsed and validated recipe.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub metadata: RecipeMetadata,
    pub schema: OptionSchema,
    pub requirements: RequirementPlanner,
    pub system_packages: Option<SystemPackages>,
    /// Option name -> CMake variable name
    pub definitions: BTreeMap<String, String>,
    /// Options that do not affect produced binaries
    pub identity_exclusions: BTreeSet<String>,
    pub layout: RecipeLayout,
}

/// Raw recipe as deserialized from TOML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRecipe {
    package: RecipeMetadata,

    #[serde(default)]
    options: BTreeMap<String, RawOption>,

    #[serde(default)]
    prune: Vec<RawPrune>,

    #[serde(default)]
    requirements: RawRequirements,

    #[serde(default)]
    dependency_options: BTreeMap<String, BTreeMap<String, OptionValue>>,

    #[serde(default)]
    system_packages: Option<SystemPackages>,

    #[serde(default)]
    definitions: BTreeMap<String, String>,

    #[serde(default)]
    package_id: RawPackageId,

    #[serde(default)]
    layout: RecipeLayout,
}

/// `flag = false`, `flag = { default = false }` or
/// `mode = { default = "a", choices = ["a", "b"] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOption {
    Flag(bool),
    Detailed {
        default: OptionValue,
        #[serde(default)]
        choices: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPrune {
    option: String,
    #[serde(default)]
    os: Option<String>,
    #[serde(default)]
    compiler: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRequirements {
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    build_requires: Vec<String>,
    #[serde(default)]
    when: Vec<RawConditional>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConditional {
    option: String,
    /// Defaults to `true`
    #[serde(default)]
    value: Option<OptionValue>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    build_requires: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackageId {
    #[serde(default)]
    exclude: Vec<String>,
}

impl Recipe {
    /// Load a recipe from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("invalid recipe: {}", path.display()))
    }

    /// A recipe compiled into the binary.
    pub fn builtin(name: &str) -> Option<Result<Self>> {
        match name {
            "sycl-info" => Some(Self::parse(SYCL_INFO_RECIPE)),
            _ => None,
        }
    }

    /// Parse and validate recipe content.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawRecipe =
            toml::from_str(content).with_context(|| format!("failed to parse {}", RECIPE_FILE))?;

        let recipe = Self::convert(raw)?;
        recipe.validate()?;
        Ok(recipe)
    }

    fn convert(raw: RawRecipe) -> Result<Self, ValidationError> {
        let mut schema = OptionSchema::new();
        for (name, option) in raw.options {
            schema = match option {
                RawOption::Flag(default) => schema.bool_option(&name, default),
                RawOption::Detailed { default, choices } if choices.is_empty() => {
                    schema.option(OptionDefinition {
                        name,
                        domain: OptionDomain::Bool,
                        default,
                    })
                }
                RawOption::Detailed { default, choices } => schema.option(OptionDefinition {
                    name,
                    domain: OptionDomain::Choices(choices),
                    default,
                }),
            };
        }

        for prune in raw.prune {
            schema = schema.prune(PruneRule {
                option: prune.option,
                os: prune.os.as_deref().map(str::parse::<OsFamily>).transpose()?,
                compiler: prune.compiler,
            });
        }

        let mut requirements = RequirementPlanner::new();
        for reference in &raw.requirements.requires {
            requirements =
                requirements.baseline(RequirementSpec::parse(reference, RequirementKind::RunTime)?);
        }
        for reference in &raw.requirements.build_requires {
            requirements = requirements
                .baseline(RequirementSpec::parse(reference, RequirementKind::BuildTime)?);
        }

        for rule in raw.requirements.when {
            let value = rule.value.unwrap_or(OptionValue::Bool(true));
            let declared = rule
                .requires
                .iter()
                .map(|r| (r, RequirementKind::RunTime))
                .chain(rule.build_requires.iter().map(|r| (r, RequirementKind::BuildTime)));
            for (reference, kind) in declared {
                requirements = requirements.rule(ConditionalRequirement {
                    option: rule.option.clone(),
                    value: value.clone(),
                    requirement: RequirementSpec::parse(reference, kind)?,
                });
            }
        }

        for (dependency, options) in raw.dependency_options {
            for (option, value) in options {
                requirements = requirements.dependency_option(&dependency, &option, value);
            }
        }

        Ok(Recipe {
            metadata: raw.package,
            schema,
            requirements,
            system_packages: raw.system_packages,
            definitions: raw.definitions,
            identity_exclusions: raw.package_id.exclude.into_iter().collect(),
            layout: raw.layout,
        })
    }

    /// Check that every option referenced anywhere is declared.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.schema.validate()?;
        self.requirements.validate(&self.schema)?;

        if let Some(ref packages) = self.system_packages {
            let def = self.schema.require(&packages.when, "system-packages")?;
            if def.domain != OptionDomain::Bool {
                return Err(ValidationError::InvalidOptionValue {
                    option: packages.when.clone(),
                    value: def.default.to_string(),
                    expected: "a boolean option to gate system packages".to_string(),
                });
            }
        }

        for option in self.definitions.keys() {
            self.schema.require(option, "definitions")?;
        }

        for option in &self.identity_exclusions {
            self.schema.require(option, "package-id.exclude")?;
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// CMake variable for `option`: the declared name, else the option upper-cased.
    pub fn definition_for(&self, option: &str) -> String {
        self.definitions
            .get(option)
            .cloned()
            .unwrap_or_else(|| option.to_ascii_uppercase())
    }

    /// Read the declared version from the source tree.
    pub fn version(&self, source_dir: &Path) -> Version {
        resolve_version_file(&source_dir.join(&self.layout.build_description), self.name())
    }
}

/// Find the recipe for a source tree: `<source>/Foundry.toml`.
pub fn find_recipe(source_dir: &Path) -> Option<PathBuf> {
    let path = source_dir.join(RECIPE_FILE);
    path.is_file().then_some(path)
}
