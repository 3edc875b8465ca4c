//! Recipe validation errors.
//!
//! Validation errors are fatal and always surface before any external
//! command is issued.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A recipe or request that is internally inconsistent.
#[derive(Debug, Error, MietteDiagnostic, PartialEq, Eq)]
pub enum ValidationError {
    #[error("requirement `{name}` is declared more than once")]
    #[diagnostic(code(foundry::recipe::duplicate_requirement))]
    DuplicateRequirement {
        name: String,
        first: String,
        second: String,
    },

    #[error("option `{option}` is not declared (referenced by {referenced_by})")]
    #[diagnostic(code(foundry::recipe::unknown_option))]
    UnknownOption {
        option: String,
        referenced_by: String,
        declared: Vec<String>,
    },

    #[error("invalid value `{value}` for option `{option}`")]
    #[diagnostic(code(foundry::recipe::invalid_option_value))]
    InvalidOptionValue {
        option: String,
        value: String,
        expected: String,
    },

    #[error("malformed requirement reference `{reference}`")]
    #[diagnostic(
        code(foundry::recipe::malformed_reference),
        help("references look like `name/version` or `name/version@user/channel`")
    )]
    MalformedReference { reference: String },

    #[error("dependency options target `{dependency}`, which is not a requirement")]
    #[diagnostic(code(foundry::recipe::unknown_dependency))]
    UnknownDependency { dependency: String },

    #[error("invalid value `{value}` for setting `{setting}`")]
    #[diagnostic(code(foundry::request::invalid_setting))]
    InvalidSetting {
        setting: String,
        value: String,
        expected: String,
    },

    #[error("malformed override `{input}`")]
    #[diagnostic(
        code(foundry::request::malformed_override),
        help("overrides look like `name=value`")
    )]
    MalformedOverride { input: String },
}

impl ValidationError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ValidationError::DuplicateRequirement {
                name,
                first,
                second,
            } => Diagnostic::error(format!("requirement `{}` is declared more than once", name))
                .with_context(format!("first declared as `{}`", first))
                .with_context(format!("declared again as `{}`", second))
                .with_suggestion("Keep a single declaration per requirement"),

            ValidationError::UnknownOption {
                option,
                referenced_by,
                declared,
            } => {
                let mut diag = Diagnostic::error(format!("option `{}` is not declared", option))
                    .with_context(format!("referenced by {}", referenced_by));
                if !declared.is_empty() {
                    diag = diag.with_context(format!("declared options: {}", declared.join(", ")));
                }
                diag.with_suggestion(suggestions::UNKNOWN_OPTION)
            }

            ValidationError::InvalidOptionValue {
                option,
                value,
                expected,
            } => Diagnostic::error(format!("invalid value `{}` for option `{}`", value, option))
                .with_context(format!("expected {}", expected)),

            ValidationError::MalformedReference { reference } => {
                Diagnostic::error(format!("malformed requirement reference `{}`", reference))
                    .with_suggestion("Write references as `name/version[@user/channel]`")
            }

            ValidationError::UnknownDependency { dependency } => Diagnostic::error(format!(
                "dependency options target `{}`, which is not a requirement",
                dependency
            ))
            .with_suggestion(format!(
                "Add `{}` to `requires` or remove its dependency options",
                dependency
            )),

            ValidationError::InvalidSetting {
                setting,
                value,
                expected,
            } => Diagnostic::error(format!("invalid value `{}` for setting `{}`", value, setting))
                .with_context(format!("expected {}", expected)),

            ValidationError::MalformedOverride { input } => {
                Diagnostic::error(format!("malformed override `{}`", input))
                    .with_suggestion("Write overrides as `-o name=value`")
            }
        }
    }
}
