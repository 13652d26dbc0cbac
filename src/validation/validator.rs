//! Parameter Validator: checks and fills call arguments against a canonical schema.
//!
//! Pure: no I/O, no session access. The invoker decides what to do with the result.

use serde_json::{Map, Value};

use crate::schema::{CanonicalSchema, PropertySpec};

use super::coerce::{coerce, values_equal};
use super::types::{ValidationIssue, ValidationResult};

/// Validate `provided` against `schema`.
///
/// Order: missing required names short-circuit; then defaults are filled;
/// then provided values are coerced; then enum and range constraints are
/// checked on the coerced values.
pub fn validate(schema: &CanonicalSchema, provided: &Map<String, Value>) -> ValidationResult {
    let missing: std::collections::BTreeSet<String> = schema
        .required
        .iter()
        .filter(|name| !provided.contains_key(name.as_str()))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return ValidationResult {
            ok: false,
            filled_args: provided.clone(),
            missing,
            ..ValidationResult::default()
        };
    }

    let mut result = ValidationResult::default();

    // Defaults for omitted parameters
    for (name, spec) in &schema.properties {
        if provided.contains_key(name) {
            continue;
        }
        let Some(ref default) = spec.default else {
            continue;
        };
        match coerce(default, spec.ty) {
            Ok(value) => match check_constraints(name, &value, spec).first() {
                None => {
                    tracing::debug!(param = %name, value = %value, "filled default");
                    result.filled_args.insert(name.clone(), value);
                }
                Some(issue) => result.warnings.push(format!("ignored default: {issue}")),
            },
            Err(found) => result.warnings.push(format!(
                "ignored default for '{name}': expected {}, got {found}",
                spec.ty
            )),
        }
    }

    for (name, value) in provided {
        let Some(spec) = schema.properties.get(name) else {
            result
                .warnings
                .push(format!("'{name}' is not a declared parameter; passed through unchanged"));
            result.filled_args.insert(name.clone(), value.clone());
            continue;
        };

        match coerce(value, spec.ty) {
            Ok(coerced) => {
                result.type_errors.extend(check_constraints(name, &coerced, spec));
                result.filled_args.insert(name.clone(), coerced);
            }
            Err(found) => result.type_errors.push(ValidationIssue::TypeMismatch {
                name: name.clone(),
                expected: spec.ty,
                found,
            }),
        }
    }

    result.ok = result.type_errors.is_empty();
    result
}

fn check_constraints(name: &str, value: &Value, spec: &PropertySpec) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let violation = |reason: String| ValidationIssue::ConstraintViolation {
        name: name.to_string(),
        value: value.clone(),
        reason,
    };

    if let Some(ref allowed) = spec.enum_values {
        if !allowed.iter().any(|a| values_equal(a, value)) {
            let list = allowed
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            issues.push(violation(format!("is not one of [{list}]")));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = spec.minimum.filter(|min| n < *min) {
            issues.push(violation(format!("is below the minimum {min}")));
        }
        if let Some(max) = spec.maximum.filter(|max| n > *max) {
            issues.push(violation(format!("is above the maximum {max}")));
        }
    }

    issues
}

// ─── Tests ───────────────────────────────────────────────────────────────────
