//! Value coercion toward a declared property type.
//!
//! Literal parsing uses Rust's `str::parse`, which is locale-independent.

use serde_json::{Number, Value};

use crate::schema::PropertyType;

/// Coerce `value` to `ty`, or describe what was found instead.
pub fn coerce(value: &Value, ty: PropertyType) -> Result<Value, String> {
    match ty {
        PropertyType::Any => Ok(value.clone()),
        PropertyType::String => to_string(value),
        PropertyType::Integer => to_integer(value),
        PropertyType::Number => to_number(value),
        PropertyType::Boolean => to_boolean(value),
        PropertyType::Array => to_container(value, Value::is_array),
        PropertyType::Object => to_container(value, Value::is_object),
        PropertyType::Null => match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if s.trim() == "null" => Ok(Value::Null),
            other => Err(describe(other)),
        },
    }
}

fn to_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(describe(other)),
    }
}

fn to_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .and_then(integral)
            .ok_or_else(|| format!("non-integral number {n}")),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(integral)
                .ok_or_else(|| format!("text \"{s}\""))
        }
        other => Err(describe(other)),
    }
}

fn integral(f: f64) -> Option<Value> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| Value::from(f as i64))
}

fn to_number(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("text \"{s}\""))
        }
        other => Err(describe(other)),
    }
}

fn to_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("text \"{s}\"")),
        },
        other => Err(describe(other)),
    }
}

fn to_container(value: &Value, is_kind: fn(&Value) -> bool) -> Result<Value, String> {
    if is_kind(value) {
        return Ok(value.clone());
    }
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(parsed) if is_kind(&parsed) => Ok(parsed),
            _ => Err(format!("text \"{s}\"")),
        },
        other => Err(describe(other)),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("text \"{s}\""),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// JSON equality that treats `5` and `5.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
