//! Validation result and diagnostic types.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{CanonicalSchema, PropertyType, ToolDescriptor};

use super::coerce::coerce;
use super::example::example_call;

/// One problem found while validating arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("missing required parameter '{name}'")]
    MissingRequired { name: String },

    #[error("parameter '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: PropertyType,
        found: String,
    },

    #[error("parameter '{name}' value {value} {reason}")]
    ConstraintViolation {
        name: String,
        value: Value,
        reason: String,
    },
}

impl ValidationIssue {
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingRequired { name }
            | Self::TypeMismatch { name, .. }
            | Self::ConstraintViolation { name, .. } => name,
        }
    }
}

/// Outcome of validating one argument set against a canonical schema.
///
/// When `ok` is true every required parameter is present in `filled_args`
/// and every declared value matches its declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub ok: bool,
    pub filled_args: Map<String, Value>,
    pub missing: BTreeSet<String>,
    pub type_errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Missing parameters followed by type and constraint errors.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.missing
            .iter()
            .map(|name| ValidationIssue::MissingRequired { name: name.clone() })
            .chain(self.type_errors.iter().cloned())
            .collect()
    }
}

/// A missing parameter with what the user needs to supply it.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingParam {
    pub name: String,
    pub ty: PropertyType,
    pub description: Option<String>,
}

/// Renderable explanation of a failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDiagnostics {
    pub tool_name: String,
    pub missing: Vec<MissingParam>,
    pub type_errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    /// e.g. `call search-models {"query": "<string>", "limit": 5}`
    pub example: String,
}

impl ValidationDiagnostics {
    pub fn new(tool: &ToolDescriptor, provided: &Map<String, Value>, result: &ValidationResult) -> Self {
        let missing = result
            .missing
            .iter()
            .map(|name| {
                let spec = tool.schema.properties.get(name);
                MissingParam {
                    name: name.clone(),
                    ty: spec.map(|s| s.ty).unwrap_or(PropertyType::Any),
                    description: spec.and_then(|s| s.description.clone()),
                }
            })
            .collect();

        Self {
            tool_name: tool.name.clone(),
            missing,
            type_errors: result.type_errors.clone(),
            warnings: result.warnings.clone(),
            example: example_call(&tool.name, &tool.schema, &reusable_values(&tool.schema, provided, result)),
        }
    }
}

/// Provided values worth repeating in an example: declared, well-typed and
/// not named by any issue. Everything else falls back to a placeholder.
fn reusable_values(
    schema: &CanonicalSchema,
    provided: &Map<String, Value>,
    result: &ValidationResult,
) -> Map<String, Value> {
    let issues = result.issues();
    let flagged: BTreeSet<&str> = issues.iter().map(ValidationIssue::parameter).collect();
    provided
        .iter()
        .filter(|(name, _)| !flagged.contains(name.as_str()))
        .filter_map(|(name, value)| {
            let spec = schema.properties.get(name)?;
            coerce(value, spec.ty).ok().map(|v| (name.clone(), v))
        })
        .collect()
}
