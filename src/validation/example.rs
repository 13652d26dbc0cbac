//! Synthesized example calls for diagnostics and `schema` output.

use serde_json::{Map, Value};

use crate::schema::types::number_value;
use crate::schema::{CanonicalSchema, PropertySpec, PropertyType};

/// Optional parameters with defaults shown in an example, beyond those provided.
const MAX_OPTIONAL_DEFAULTS: usize = 3;

/// Build `call <tool> {...}` with required parameters first.
///
/// Provided values are reused; optional parameters appear when provided or
/// when they carry a default.
pub fn example_call(tool_name: &str, schema: &CanonicalSchema, provided: &Map<String, Value>) -> String {
    let mut entries: Vec<(&str, Value)> = Vec::new();
    let mut optional_defaults = 0;

    for (name, spec) in schema.ordered_properties() {
        if schema.is_required(name) || provided.contains_key(name) {
            entries.push((name, example_value(spec, provided.get(name))));
        } else if spec.default.is_some() && optional_defaults < MAX_OPTIONAL_DEFAULTS {
            optional_defaults += 1;
            entries.push((name, example_value(spec, None)));
        }
    }

    format!("call {tool_name} {}", render_object(&entries))
}

/// Placeholder for one parameter.
pub fn example_value(spec: &PropertySpec, provided: Option<&Value>) -> Value {
    if let Some(v) = provided {
        return v.clone();
    }
    if let Some(first) = spec.enum_values.as_ref().and_then(|e| e.first()) {
        return first.clone();
    }
    if let Some(ref d) = spec.default {
        return d.clone();
    }
    if let Some(ex) = spec.extra.get("example") {
        return ex.clone();
    }
    placeholder(spec)
}

fn placeholder(spec: &PropertySpec) -> Value {
    match spec.ty {
        PropertyType::String => Value::from("<string>"),
        PropertyType::Integer | PropertyType::Number => {
            let mid = match (spec.minimum, spec.maximum) {
                (Some(lo), Some(hi)) => (lo + hi) / 2.0,
                (Some(bound), None) | (None, Some(bound)) => bound,
                (None, None) => 0.0,
            };
            if spec.ty == PropertyType::Integer {
                Value::from(mid.floor() as i64)
            } else {
                number_value(mid)
            }
        }
        PropertyType::Boolean => Value::Bool(true),
        PropertyType::Array => Value::Array(Vec::new()),
        PropertyType::Object => Value::Object(Map::new()),
        PropertyType::Null | PropertyType::Any => Value::Null,
    }
}

/// `{"a": 1, "b": "x"}` in the given key order.
fn render_object(entries: &[(&str, Value)]) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let body = entries
        .iter()
        .map(|(k, v)| format!("{}: {v}", Value::from(*k)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}
