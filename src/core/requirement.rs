//! Requirement references and the conditional requirement planner.
//!
//! Requirements are only planned here. The output order is the declared
//! order: run-time baseline, build-time baseline, then conditional rules in
//! the order they were written.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::errors::ValidationError;
use crate::core::options::{OptionSchema, OptionValue, ResolvedOptions};

/// When a requirement is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequirementKind {
    /// Needed only while building (tools, header-only libs, test frameworks)
    BuildTime,
    /// Needed by consumers of the produced package
    RunTime,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::BuildTime => f.write_str("build"),
            RequirementKind::RunTime => f.write_str("run"),
        }
    }
}

/// A single dependency: `name/version[@user/channel]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementSpec {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub kind: RequirementKind,
    /// Options requested for this dependency
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

impl RequirementSpec {
    /// Parse a reference as a requirement of the given kind.
    pub fn parse(reference: &str, kind: RequirementKind) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedReference {
            reference: reference.to_string(),
        };

        let (name_version, channel) = match reference.trim().split_once('@') {
            Some((nv, ch)) => (nv, Some(ch)),
            None => (reference.trim(), None),
        };

        let (name, version) = name_version.split_once('/').ok_or_else(malformed)?;
        if name.is_empty() || version.is_empty() || version.contains('/') {
            return Err(malformed());
        }

        if let Some(ch) = channel {
            let valid = ch
                .split_once('/')
                .map_or(false, |(user, chan)| !user.is_empty() && !chan.is_empty() && !chan.contains('/'));
            if !valid {
                return Err(malformed());
            }
        }

        Ok(RequirementSpec {
            name: name.to_string(),
            version: version.to_string(),
            channel: channel.map(str::to_string),
            kind,
            options: BTreeMap::new(),
        })
    }

    /// The reference string this requirement was declared with.
    pub fn reference(&self) -> String {
        match &self.channel {
            Some(ch) => format!("{}/{}@{}", self.name, self.version, ch),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reference(), self.kind)
    }
}

impl FromStr for RequirementSpec {
    type Err = ValidationError;

    /// Parses as a run-time requirement.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequirementSpec::parse(s, RequirementKind::RunTime)
    }
}

/// "If `option` resolves to `value`, append `requirement`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRequirement {
    pub option: String,
    pub value: OptionValue,
    pub requirement: RequirementSpec,
}

impl ConditionalRequirement {
    /// Rule that fires when a boolean option is true.
    pub fn when_true(option: &str, requirement: RequirementSpec) -> Self {
        ConditionalRequirement {
            option: option.to_string(),
            value: OptionValue::Bool(true),
            requirement,
        }
    }

    /// Pruned options never satisfy a rule.
    pub fn applies(&self, options: &ResolvedOptions) -> bool {
        options.get(&self.option) == Some(&self.value)
    }
}

/// Baseline requirements plus ordered conditional rules.
#[derive(Debug, Clone, Default)]
pub struct RequirementPlanner {
    baseline: Vec<RequirementSpec>,
    rules: Vec<ConditionalRequirement>,
    dependency_options: BTreeMap<String, BTreeMap<String, OptionValue>>,
}

impl RequirementPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an always-required dependency.
    pub fn baseline(mut self, requirement: RequirementSpec) -> Self {
        self.baseline.push(requirement);
        self
    }

    /// Add a conditional rule; rules fire in insertion order.
    pub fn rule(mut self, rule: ConditionalRequirement) -> Self {
        self.rules.push(rule);
        self
    }

    /// Request `option = value` on dependency `dependency`.
    pub fn dependency_option(mut self, dependency: &str, option: &str, value: OptionValue) -> Self {
        self.dependency_options
            .entry(dependency.to_string())
            .or_default()
            .insert(option.to_string(), value);
        self
    }

    pub fn rules(&self) -> &[ConditionalRequirement] {
        &self.rules
    }

    /// Check every cross reference: rule options exist in `schema`, rule
    /// values fit their domain, dependency options name a requirement, and
    /// no two requirements that can be planned together share a name.
    pub fn validate(&self, schema: &OptionSchema) -> Result<(), ValidationError> {
        self.check_duplicates()?;

        for rule in &self.rules {
            let referenced_by = format!("the requirement rule for `{}`", rule.requirement.name);
            let def = schema.require(&rule.option, &referenced_by)?;
            if !def.domain.contains(&rule.value) {
                return Err(ValidationError::InvalidOptionValue {
                    option: rule.option.clone(),
                    value: rule.value.to_string(),
                    expected: def.domain.to_string(),
                });
            }
        }

        for dependency in self.dependency_options.keys() {
            let known = self
                .baseline
                .iter()
                .chain(self.rules.iter().map(|r| &r.requirement))
                .any(|r| &r.name == dependency);
            if !known {
                return Err(ValidationError::UnknownDependency {
                    dependency: dependency.clone(),
                });
            }
        }

        Ok(())
    }

    /// Duplicate names in any configuration. Two rules on the same option
    /// with different values never fire together.
    fn check_duplicates(&self) -> Result<(), ValidationError> {
        let duplicate = |first: &RequirementSpec, second: &RequirementSpec| {
            ValidationError::DuplicateRequirement {
                name: second.name.clone(),
                first: first.reference(),
                second: second.reference(),
            }
        };

        for (i, requirement) in self.baseline.iter().enumerate() {
            if let Some(existing) = self.baseline[..i].iter().find(|r| r.name == requirement.name) {
                return Err(duplicate(existing, requirement));
            }
        }

        for (i, rule) in self.rules.iter().enumerate() {
            let requirement = &rule.requirement;
            if let Some(existing) = self.baseline.iter().find(|r| r.name == requirement.name) {
                return Err(duplicate(existing, requirement));
            }

            let overlapping = self.rules[..i].iter().find(|other| {
                other.requirement.name == requirement.name
                    && (other.option != rule.option || other.value == rule.value)
            });
            if let Some(other) = overlapping {
                return Err(duplicate(&other.requirement, requirement));
            }
        }

        Ok(())
    }

    /// Requirements that apply for `options`, in declared order.
    pub fn plan_requirements(
        &self,
        options: &ResolvedOptions,
    ) -> Result<Vec<RequirementSpec>, ValidationError> {
        let selected = self.baseline.iter().chain(
            self.rules
                .iter()
                .filter(|rule| rule.applies(options))
                .map(|rule| &rule.requirement),
        );

        let mut planned: Vec<RequirementSpec> = Vec::new();
        for requirement in selected {
            if let Some(existing) = planned.iter().find(|r| r.name == requirement.name) {
                return Err(ValidationError::DuplicateRequirement {
                    name: requirement.name.clone(),
                    first: existing.reference(),
                    second: requirement.reference(),
                });
            }

            let mut requirement = requirement.clone();
            if let Some(opts) = self.dependency_options.get(&requirement.name) {
                requirement.options = opts.clone();
            }
            tracing::debug!("requirement {}", requirement);
            planned.push(requirement);
        }

        Ok(planned)
    }
}
