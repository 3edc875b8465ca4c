//! Option schema: declared options, caller overrides and platform pruning.
//!
//! Resolution always runs in the same order: declared defaults, then caller
//! overrides, then pruning. Pruning removes an option from the resolved set
//! entirely; it never rewrites it to `false`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;
use crate::core::platform::{OsFamily, PlatformDescriptor};

/// A concrete option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Choice(_) => None,
        }
    }

    /// Value as a CMake cache definition (`ON`/`OFF` for booleans).
    pub fn as_cmake(&self) -> String {
        match self {
            OptionValue::Bool(true) => "ON".to_string(),
            OptionValue::Bool(false) => "OFF".to_string(),
            OptionValue::Choice(s) => s.clone(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Choice(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Choice(s.to_string())
    }
}

/// The set of values an option accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionDomain {
    Bool,
    Choices(Vec<String>),
}

impl OptionDomain {
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (OptionDomain::Bool, OptionValue::Bool(_)) => true,
            (OptionDomain::Choices(choices), OptionValue::Choice(c)) => choices.contains(c),
            _ => false,
        }
    }

    /// Parse a command-line value for an option of this domain.
    pub fn parse_value(&self, option: &str, raw: &str) -> Result<OptionValue, ValidationError> {
        let raw = raw.trim();
        let parsed = match self {
            OptionDomain::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Some(OptionValue::Bool(true)),
                "false" | "0" | "off" | "no" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            OptionDomain::Choices(choices) => choices
                .iter()
                .find(|c| c.as_str() == raw)
                .map(|c| OptionValue::Choice(c.clone())),
        };

        parsed.ok_or_else(|| ValidationError::InvalidOptionValue {
            option: option.to_string(),
            value: raw.to_string(),
            expected: self.to_string(),
        })
    }
}

impl fmt::Display for OptionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionDomain::Bool => f.write_str("a boolean"),
            OptionDomain::Choices(choices) => write!(f, "one of {}", choices.join(", ")),
        }
    }
}

/// One declared option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDefinition {
    pub name: String,
    pub domain: OptionDomain,
    pub default: OptionValue,
}

/// Removes `option` from the resolved set when the platform matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRule {
    pub option: String,
    pub os: Option<OsFamily>,
    pub compiler: Option<String>,
}

impl PruneRule {
    /// Both predicates must hold; an unset predicate always holds.
    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        self.os.map_or(true, |os| os == platform.os)
            && self
                .compiler
                .as_deref()
                .map_or(true, |c| c == platform.compiler.family)
    }
}

/// Concrete option values for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedOptions(BTreeMap<String, OptionValue>);

impl ResolvedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether `name` is present and boolean true. Absent reads as false.
    pub fn is_true(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(OptionValue::Bool(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.0.remove(name)
    }
}

impl FromIterator<(String, OptionValue)> for ResolvedOptions {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        ResolvedOptions(iter.into_iter().collect())
    }
}

impl fmt::Display for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&parts.join(" "))
    }
}

/// Declared options plus their platform pruning table.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    options: BTreeMap<String, OptionDefinition>,
    prune: Vec<PruneRule>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a boolean option.
    pub fn bool_option(self, name: &str, default: bool) -> Self {
        self.option(OptionDefinition {
            name: name.to_string(),
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
        })
    }

    /// Declare an option.
    pub fn option(mut self, definition: OptionDefinition) -> Self {
        self.options.insert(definition.name.clone(), definition);
        self
    }

    /// Add a pruning rule.
    pub fn prune(mut self, rule: PruneRule) -> Self {
        self.prune.push(rule);
        self
    }

    pub fn definitions(&self) -> impl Iterator<Item = &OptionDefinition> {
        self.options.values()
    }

    pub fn prune_rules(&self) -> &[PruneRule] {
        &self.prune
    }

    pub fn names(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    /// Look up `name`, reporting `referenced_by` if it is not declared.
    pub fn require(
        &self,
        name: &str,
        referenced_by: &str,
    ) -> Result<&OptionDefinition, ValidationError> {
        self.options
            .get(name)
            .ok_or_else(|| ValidationError::UnknownOption {
                option: name.to_string(),
                referenced_by: referenced_by.to_string(),
                declared: self.names(),
            })
    }

    /// Check defaults against domains and prune rules against declarations.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for def in self.options.values() {
            if !def.domain.contains(&def.default) {
                return Err(ValidationError::InvalidOptionValue {
                    option: def.name.clone(),
                    value: def.default.to_string(),
                    expected: def.domain.to_string(),
                });
            }
        }

        for rule in &self.prune {
            self.require(&rule.option, "a prune rule")?;
        }

        Ok(())
    }

    /// Declared defaults.
    pub fn defaults(&self) -> ResolvedOptions {
        self.options
            .values()
            .map(|d| (d.name.clone(), d.default.clone()))
            .collect()
    }

    /// Parse `name=value` overrides against the schema.
    pub fn parse_overrides<S: AsRef<str>>(
        &self,
        inputs: &[S],
    ) -> Result<BTreeMap<String, OptionValue>, ValidationError> {
        let mut overrides = BTreeMap::new();

        for input in inputs {
            let input = input.as_ref();
            let (name, raw) = input
                .split_once('=')
                .map(|(n, v)| (n.trim(), v))
                .filter(|(n, _)| !n.is_empty())
                .ok_or_else(|| ValidationError::MalformedOverride {
                    input: input.to_string(),
                })?;

            let def = self.require(name, "an option override")?;
            overrides.insert(name.to_string(), def.domain.parse_value(name, raw)?);
        }

        Ok(overrides)
    }

    /// Overlay `overrides` on the defaults.
    pub fn resolve(
        &self,
        overrides: &BTreeMap<String, OptionValue>,
    ) -> Result<ResolvedOptions, ValidationError> {
        let mut resolved = self.defaults();

        for (name, value) in overrides {
            let def = self.require(name, "an option override")?;
            if !def.domain.contains(value) {
                return Err(ValidationError::InvalidOptionValue {
                    option: name.clone(),
                    value: value.to_string(),
                    expected: def.domain.to_string(),
                });
            }
            resolved.0.insert(name.clone(), value.clone());
        }

        Ok(resolved)
    }

    /// Remove every option whose prune rule matches `platform`.
    pub fn prune_for_platform(
        &self,
        mut options: ResolvedOptions,
        platform: &PlatformDescriptor,
    ) -> ResolvedOptions {
        for rule in self.prune.iter().filter(|r| r.matches(platform)) {
            if options.remove(&rule.option).is_some() {
                tracing::debug!("option `{}` is unavailable on {}", rule.option, platform.os);
            }
        }
        options
    }

    /// Defaults, then overrides, then pruning.
    pub fn resolve_for_platform(
        &self,
        overrides: &BTreeMap<String, OptionValue>,
        platform: &PlatformDescriptor,
    ) -> Result<ResolvedOptions, ValidationError> {
        let resolved = self.resolve(overrides)?;
        Ok(self.prune_for_platform(resolved, platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{BuildMode, CompilerIdentity};

    fn schema() -> OptionSchema {
        OptionSchema::new()
            .bool_option("build_testing", false)
            .bool_option("fPIC", false)
            .option(OptionDefinition {
                name: "sanitizer".to_string(),
                domain: OptionDomain::Choices(vec!["none".into(), "address".into()]),
                default: "none".into(),
            })
            .prune(PruneRule {
                option: "fPIC".to_string(),
                os: Some(OsFamily::Windows),
                compiler: None,
            })
    }

    fn platform(os: OsFamily) -> PlatformDescriptor {
        PlatformDescriptor::new(os, CompilerIdentity::new("gcc", None), "x86_64", BuildMode::Release)
    }

    #[test]
    fn test_defaults() {
        let defaults = schema().defaults();
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults.get("sanitizer"), Some(&OptionValue::from("none")));
        assert!(!defaults.is_true("build_testing"));
    }

    #[test]
    fn test_overrides_are_parsed_per_domain() {
        let overrides = schema()
            .parse_overrides(&["build_testing=True", "sanitizer=address"])
            .unwrap();
        let resolved = schema().resolve(&overrides).unwrap();

        assert!(resolved.is_true("build_testing"));
        assert_eq!(resolved.get("sanitizer"), Some(&OptionValue::from("address")));
    }

    #[test]
    fn test_override_errors() {
        let s = schema();
        assert!(matches!(
            s.parse_overrides(&["build_tests=true"]),
            Err(ValidationError::UnknownOption { .. })
        ));
        assert!(matches!(
            s.parse_overrides(&["build_testing=maybe"]),
            Err(ValidationError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            s.parse_overrides(&["sanitizer=thread"]),
            Err(ValidationError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            s.parse_overrides(&["build_testing"]),
            Err(ValidationError::MalformedOverride { .. })
        ));
    }

    #[test]
    fn test_windows_prunes_fpic() {
        let s = schema();
        let windows = s.prune_for_platform(s.defaults(), &platform(OsFamily::Windows));
        assert!(!windows.contains("fPIC"));
        assert!(windows.contains("build_testing"));

        for os in [OsFamily::Linux, OsFamily::Macos, OsFamily::FreeBsd] {
            let pruned = s.prune_for_platform(s.defaults(), &platform(os));
            assert_eq!(pruned.get("fPIC"), Some(&OptionValue::Bool(false)));
        }
    }

    #[test]
    fn test_pruning_wins_over_override() {
        let s = schema();
        let overrides = s.parse_overrides(&["fPIC=true"]).unwrap();
        let resolved = s
            .resolve_for_platform(&overrides, &platform(OsFamily::Windows))
            .unwrap();
        assert!(!resolved.contains("fPIC"));
    }

    #[test]
    fn test_compiler_predicate() {
        let rule = PruneRule {
            option: "fPIC".to_string(),
            os: None,
            compiler: Some("msvc".to_string()),
        };
        assert!(!rule.matches(&platform(OsFamily::Windows)));

        let mut msvc = platform(OsFamily::Windows);
        msvc.compiler = CompilerIdentity::new("msvc", None);
        assert!(rule.matches(&msvc));
    }

    #[test]
    fn test_validate_rejects_unknown_prune_option() {
        let s = schema().prune(PruneRule {
            option: "shared".to_string(),
            os: Some(OsFamily::Macos),
            compiler: None,
        });
        assert!(matches!(
            s.validate(),
            Err(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_default_outside_domain() {
        let s = OptionSchema::new().option(OptionDefinition {
            name: "shared".to_string(),
            domain: OptionDomain::Bool,
            default: "yes".into(),
        });
        assert!(matches!(
            s.validate(),
            Err(ValidationError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn test_display_is_sorted() {
        let s = schema();
        assert_eq!(
            s.defaults().to_string(),
            "build_testing=false fPIC=false sanitizer=none"
        );
    }
}
