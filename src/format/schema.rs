//! `schema <tool>` output.

use serde_json::{Map, Value};

use crate::schema::types::number_value;
use crate::schema::{PropertySpec, PropertyType, ToolDescriptor};
use crate::validation::example_call;

use super::payload::{pretty, truncate_with_marker};

/// Enums longer than this are summarized by count.
const MAX_LISTED_ENUM_VALUES: usize = 5;

pub(crate) fn render_schema(tool: &ToolDescriptor, raw_budget: usize) -> String {
    let schema = &tool.schema;
    let mut out = format!("📝 Schema for tool '{}':\n\n", tool.name);

    if let Some(ref description) = tool.description {
        out.push_str(&format!("**Description**: {description}\n\n"));
    }

    if schema.properties.is_empty() {
        out.push_str("**No parameters defined in schema**\n\n");
    } else {
        let required = schema.required.len();
        let optional = schema.properties.len() - required;
        out.push_str(&format!(
            "**Parameters** ({required} required, {optional} optional):\n\n"
        ));

        for (name, spec) in schema.ordered_properties() {
            let marker = if schema.is_required(name) { "required" } else { "optional" };
            out.push_str(&format!("- **`{name}`** ({marker}): `{}`\n", spec.ty));
            if let Some(ref description) = spec.description {
                out.push_str(&format!("  {description}\n"));
            }
            let constraints = constraints(spec);
            if !constraints.is_empty() {
                out.push_str(&format!("  {}\n", constraints.join("\n  ")));
            }
            out.push('\n');
        }
    }

    out.push_str("**Example Usage**:\n\n");
    out.push_str(&format!(
        "```\n# Natural language command:\nschema {name}\n\n# Structured command:\n!schema {name}\n\n# Tool call example:\n{example}\n```\n\n",
        name = tool.name,
        example = example_call(&tool.name, schema, &Map::new()),
    ));

    out.push_str("**Raw Schema**:\n\n");
    let raw = truncate_with_marker(&pretty(&schema.to_value()), raw_budget);
    out.push_str(&format!("```json\n{raw}\n```"));
    out
}

fn constraints(spec: &PropertySpec) -> Vec<String> {
    let mut lines = Vec::new();
    let extra = |key: &str| spec.extra.get(key);

    if let Some(ref values) = spec.enum_values {
        if values.len() <= MAX_LISTED_ENUM_VALUES {
            let listed: Vec<String> = values.iter().map(|v| format!("`{}`", plain(v))).collect();
            lines.push(format!("Allowed values: {}", listed.join(", ")));
        } else {
            lines.push(format!("Allowed values: {} options", values.len()));
        }
    }

    if let Some(ref default) = spec.default {
        lines.push(format!("Default: `{default}`"));
    }

    match spec.ty {
        PropertyType::Integer | PropertyType::Number => {
            if let Some(min) = spec.minimum {
                lines.push(format!("Minimum: `{}`", number_value(min)));
            }
            if let Some(max) = spec.maximum {
                lines.push(format!("Maximum: `{}`", number_value(max)));
            }
        }
        PropertyType::String => {
            if let Some(v) = extra("minLength") {
                lines.push(format!("Minimum length: `{}`", plain(v)));
            }
            if let Some(v) = extra("maxLength") {
                lines.push(format!("Maximum length: `{}`", plain(v)));
            }
            if let Some(v) = extra("format") {
                lines.push(format!("Format: `{}`", plain(v)));
            }
            if let Some(v) = extra("pattern") {
                lines.push(format!("Pattern: `{}`", plain(v)));
            }
        }
        PropertyType::Array => {
            if let Some(v) = extra("minItems") {
                lines.push(format!("Minimum items: `{}`", plain(v)));
            }
            if let Some(v) = extra("maxItems") {
                lines.push(format!("Maximum items: `{}`", plain(v)));
            }
            if extra("uniqueItems").and_then(Value::as_bool) == Some(true) {
                lines.push("Items must be unique".to_string());
            }
        }
        _ => {}
    }
    lines
}

/// Strings without quotes, everything else as JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
