//! Canonical schema types shared by the normalizer, validator and formatter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

// ─── PropertyType ────────────────────────────────────────────────────────────

/// JSON-Schema primitive type of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
    /// Absent or unrecognised `type`; any value is accepted.
    Any,
}

impl PropertyType {
    /// Read a `type` keyword. Lists (`["string", "null"]`) use the first non-null entry.
    pub fn from_schema_type(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => Self::from_name(s),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .find(|s| *s != "null")
                .map(Self::from_name)
                .unwrap_or(Self::Null),
            _ => Self::Any,
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "null" => Self::Null,
            _ => Self::Any,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Any => "any",
        }
    }

    /// Whether `value` already has this type (no coercion).
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── PropertySpec ────────────────────────────────────────────────────────────

/// Keywords lifted into typed fields; everything else lands in `extra`.
const TYPED_KEYWORDS: [&str; 6] = ["type", "description", "enum", "minimum", "maximum", "default"];

/// One parameter of a canonical schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub ty: PropertyType,
    pub description: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub default: Option<Value>,
    /// Remaining keywords (`format`, `minLength`, `items`, `example`, ...) kept verbatim.
    pub extra: Map<String, Value>,
}

impl PropertySpec {
    /// Build from a raw property schema. Never fails: odd shapes degrade to `any`.
    ///
    /// A bare string (`"query": "string"`) is read as a type name.
    pub fn from_value(raw: &Value) -> Self {
        let obj = match raw {
            Value::Object(obj) => obj,
            Value::String(_) => {
                return Self {
                    ty: PropertyType::from_schema_type(Some(raw)),
                    ..Self::any()
                }
            }
            _ => return Self::any(),
        };

        let extra = obj
            .iter()
            .filter(|(k, _)| !TYPED_KEYWORDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            ty: PropertyType::from_schema_type(obj.get("type")),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            enum_values: obj.get("enum").and_then(Value::as_array).cloned(),
            minimum: obj.get("minimum").and_then(Value::as_f64),
            maximum: obj.get("maximum").and_then(Value::as_f64),
            default: obj.get("default").cloned(),
            extra,
        }
    }

    fn any() -> Self {
        Self {
            ty: PropertyType::Any,
            description: None,
            enum_values: None,
            minimum: None,
            maximum: None,
            default: None,
            extra: Map::new(),
        }
    }

    /// Render back to a JSON-Schema property.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if self.ty != PropertyType::Any {
            obj.insert("type".into(), json!(self.ty.as_str()));
        }
        if let Some(ref d) = self.description {
            obj.insert("description".into(), json!(d));
        }
        if let Some(ref e) = self.enum_values {
            obj.insert("enum".into(), Value::Array(e.clone()));
        }
        if let Some(min) = self.minimum {
            obj.insert("minimum".into(), number_value(min));
        }
        if let Some(max) = self.maximum {
            obj.insert("maximum".into(), number_value(max));
        }
        if let Some(ref d) = self.default {
            obj.insert("default".into(), d.clone());
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

/// Integral floats become JSON integers so `10.0` renders as `10`.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

// ─── CanonicalSchema ─────────────────────────────────────────────────────────

/// Normalized `{type: "object", properties, required}` schema.
///
/// Invariant: every name in `required` is a key of `properties`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalSchema {
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: BTreeSet<String>,
}

impl CanonicalSchema {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Properties ordered required-first, then by name.
    pub fn ordered_properties(&self) -> Vec<(&str, &PropertySpec)> {
        let mut props: Vec<(&str, &PropertySpec)> = self
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        props.sort_by_key(|(name, _)| (!self.is_required(name), *name));
        props
    }

    pub fn to_value(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required.iter().collect::<Vec<_>>(),
        })
    }
}

// ─── Tool Descriptors ────────────────────────────────────────────────────────

/// A tool whose schema has been normalized. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub schema: CanonicalSchema,
}

/// Lazily evaluated schema source, invoked at most once across all clones.
#[derive(Clone)]
pub struct SchemaProvider {
    produce: Arc<dyn Fn() -> Value + Send + Sync>,
    cache: Arc<OnceLock<Value>>,
}

impl SchemaProvider {
    pub fn new(produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            produce: Arc::new(produce),
            cache: Arc::new(OnceLock::new()),
        }
    }

    /// The provided schema, computing it on first use.
    pub fn resolve(&self) -> &Value {
        self.cache.get_or_init(|| (self.produce)())
    }
}

impl fmt::Debug for SchemaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaProvider")
            .field("resolved", &self.cache.get().is_some())
            .finish()
    }
}

/// Where a raw descriptor's schema comes from.
#[derive(Debug, Clone)]
pub enum DescriptorSource {
    /// A mapping: either the schema itself or a descriptor nesting it.
    Inline(Value),
    /// A zero-argument callable returning one of the inline shapes.
    Provider(SchemaProvider),
}

/// A tool descriptor as received from a backend, before normalization.
#[derive(Debug, Clone)]
pub struct RawToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub source: DescriptorSource,
}

impl RawToolDescriptor {
    pub fn inline(name: &str, raw: Value) -> Self {
        let description = raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            name: name.to_string(),
            description,
            source: DescriptorSource::Inline(raw),
        }
    }

    pub fn provided(name: &str, provider: SchemaProvider) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            source: DescriptorSource::Provider(provider),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
