//! Schema Normalizer: turns heterogeneous tool descriptors into a
//! [`CanonicalSchema`].
//!
//! Backends describe tool parameters in several shapes. The normalizer tries a
//! fixed chain of adapters, first match wins:
//!
//! 1. `inputSchema` (MCP)
//! 2. `input_schema`
//! 3. `parameters`
//! 4. `parameter_schema`
//! 5. `schema`
//! 6. the descriptor itself, when it looks like an object schema
//!
//! Normalization is pure and idempotent: feeding a canonical schema's JSON
//! back through [`normalize_schema`] yields the same schema.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::errors::NormalizationError;
use super::types::{
    CanonicalSchema, DescriptorSource, PropertySpec, RawToolDescriptor, ToolDescriptor,
};

// ─── Adapters ────────────────────────────────────────────────────────────────

/// Locates the object-schema root inside a raw descriptor.
trait SchemaAdapter {
    fn name(&self) -> &'static str;
    fn locate<'a>(&self, raw: &'a Map<String, Value>) -> Option<&'a Map<String, Value>>;
}

/// The schema lives under a well-known key.
struct NestedKey(&'static str);

impl SchemaAdapter for NestedKey {
    fn name(&self) -> &'static str {
        self.0
    }

    fn locate<'a>(&self, raw: &'a Map<String, Value>) -> Option<&'a Map<String, Value>> {
        raw.get(self.0).and_then(Value::as_object)
    }
}

/// The descriptor is the schema.
struct Root;

impl SchemaAdapter for Root {
    fn name(&self) -> &'static str {
        "root"
    }

    fn locate<'a>(&self, raw: &'a Map<String, Value>) -> Option<&'a Map<String, Value>> {
        let looks_like_schema =
            raw.contains_key("properties") || raw.get("type").and_then(Value::as_str) == Some("object");
        looks_like_schema.then_some(raw)
    }
}

const ADAPTER_CHAIN: &[&dyn SchemaAdapter] = &[
    &NestedKey("inputSchema"),
    &NestedKey("input_schema"),
    &NestedKey("parameters"),
    &NestedKey("parameter_schema"),
    &NestedKey("schema"),
    &Root,
];

// ─── Normalization ───────────────────────────────────────────────────────────

/// Normalize a raw tool descriptor, resolving a provider if needed.
pub fn normalize(raw: &RawToolDescriptor) -> Result<ToolDescriptor, NormalizationError> {
    let resolved = match &raw.source {
        DescriptorSource::Inline(value) => value,
        DescriptorSource::Provider(provider) => provider.resolve(),
    };

    let schema = normalize_schema(resolved)?;
    let description = raw.description.clone().or_else(|| {
        resolved
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    Ok(ToolDescriptor {
        name: raw.name.clone(),
        description,
        schema,
    })
}

/// Normalize a single descriptor or schema value.
pub fn normalize_schema(raw: &Value) -> Result<CanonicalSchema, NormalizationError> {
    let obj = raw.as_object().ok_or_else(|| NormalizationError::NotAnObject {
        found: json_kind(raw).to_string(),
    })?;

    let (adapter, root) = ADAPTER_CHAIN
        .iter()
        .find_map(|a| a.locate(obj).map(|root| (a.name(), root)))
        .ok_or_else(|| NormalizationError::UnsupportedSchemaShape {
            reason: "no schema, parameters or properties found".to_string(),
        })?;

    check_root_type(root)?;

    let properties: BTreeMap<String, PropertySpec> = match root.get("properties") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(props)) => props
            .iter()
            .map(|(name, spec)| (name.clone(), PropertySpec::from_value(spec)))
            .collect(),
        Some(other) => {
            tracing::warn!(adapter, found = json_kind(other), "ignoring non-object properties");
            BTreeMap::new()
        }
    };

    let mut required = BTreeSet::new();
    match root.get("required") {
        None | Some(Value::Null) => {}
        Some(Value::Array(names)) => {
            for name in names.iter().filter_map(Value::as_str) {
                if properties.contains_key(name) {
                    required.insert(name.to_string());
                } else {
                    tracing::warn!(adapter, name, "dropping required name with no property");
                }
            }
        }
        Some(other) => {
            tracing::warn!(adapter, found = json_kind(other), "ignoring non-array required");
        }
    }

    Ok(CanonicalSchema {
        properties,
        required,
    })
}

/// A declared root `type` must be (or include) `object`.
fn check_root_type(root: &Map<String, Value>) -> Result<(), NormalizationError> {
    let ok = match root.get("type") {
        None => true,
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("object")),
        Some(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(NormalizationError::NotAnObject {
            found: root
                .get("type")
                .map(|t| t.to_string())
                .unwrap_or_default(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{PropertyType, SchemaProvider};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn search_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "default": 10}
            },
            "required": ["query"]
        })
    }

    #[test]
    fn test_every_adapter_shape_yields_same_schema() {
        let expected = normalize_schema(&search_schema()).unwrap();
        for key in ["inputSchema", "input_schema", "parameters", "parameter_schema", "schema"] {
            let mut wrapped = json!({"name": "search"});
            wrapped[key] = search_schema();
            assert_eq!(normalize_schema(&wrapped).unwrap(), expected, "key {key}");
        }
    }

    #[test]
    fn test_adapter_priority_prefers_input_schema() {
        let raw = json!({
            "parameters": {"properties": {"old": {"type": "string"}}},
            "inputSchema": {"properties": {"new": {"type": "string"}}}
        });
        let schema = normalize_schema(&raw).unwrap();
        assert!(schema.properties.contains_key("new"));
        assert!(!schema.properties.contains_key("old"));
    }

    #[test]
    fn test_missing_properties_default_to_empty() {
        let schema = normalize_schema(&json!({"inputSchema": {"type": "object"}})).unwrap();
        assert!(schema.properties.is_empty());
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_required_without_property_is_dropped() {
        let raw = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a", "ghost"]
        });
        let schema = normalize_schema(&raw).unwrap();
        assert_eq!(schema.required.len(), 1);
        assert!(schema.is_required("a"));
    }

    #[test]
    fn test_non_object_root_rejected() {
        let err = normalize_schema(&json!({"inputSchema": {"type": "string"}})).unwrap_err();
        assert!(matches!(err, NormalizationError::NotAnObject { .. }));

        let err = normalize_schema(&json!("just a string")).unwrap_err();
        assert_eq!(
            err,
            NormalizationError::NotAnObject {
                found: "string".into()
            }
        );
    }

    #[test]
    fn test_unrecognized_shape_rejected() {
        let err = normalize_schema(&json!({"name": "x", "args": []})).unwrap_err();
        assert!(matches!(err, NormalizationError::UnsupportedSchemaShape { .. }));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = json!({
            "inputSchema": {
                "type": "object",
                "properties": {
                    "q": {"type": ["string", "null"], "minLength": 1},
                    "n": {"type": "number", "minimum": 0.5, "maximum": 2},
                    "mode": {"enum": ["fast", "slow"]},
                    "odd": true
                },
                "required": ["q", "missing"]
            }
        });
        let once = normalize_schema(&raw).unwrap();
        let twice = normalize_schema(&once.to_value()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.properties["odd"].ty, PropertyType::Any);
    }

    fn arb_type() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None::<Value>),
            prop::sample::select(vec!["string", "integer", "number", "boolean", "array", "object", "null", "weird"])
                .prop_map(|t| Some(json!(t))),
            Just(Some(json!(["string", "null"]))),
            Just(Some(json!(["null"]))),
            Just(Some(json!(7))),
        ]
    }

    fn arb_property() -> impl Strategy<Value = Value> {
        let object = (
            arb_type(),
            prop::option::of("[a-z ]{0,8}"),
            prop::option::of(-50i32..50),
            prop::option::of(-2.5f64..2.5),
            prop::option::of(prop_oneof![Just(json!(1)), Just(json!("x")), Just(Value::Null)]),
            prop::option::of(Just(json!(["a", 1, null]))),
            any::<bool>(),
        )
            .prop_map(|(ty, description, minimum, maximum, default, enum_values, format)| {
                let mut spec = Map::new();
                if let Some(ty) = ty {
                    spec.insert("type".into(), ty);
                }
                if let Some(d) = description {
                    spec.insert("description".into(), json!(d));
                }
                if let Some(min) = minimum {
                    spec.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    spec.insert("maximum".into(), json!(max));
                }
                if let Some(d) = default {
                    spec.insert("default".into(), d);
                }
                if let Some(e) = enum_values {
                    spec.insert("enum".into(), e);
                }
                if format {
                    spec.insert("format".into(), json!("uri"));
                }
                Value::Object(spec)
            });
        prop_oneof![
            4 => object,
            1 => Just(json!("string")),
            1 => Just(json!("nonsense")),
            1 => Just(json!(true)),
            1 => Just(Value::Null),
        ]
    }

    fn arb_descriptor() -> impl Strategy<Value = Value> {
        let properties = prop_oneof![
            4 => prop::collection::btree_map("[a-e]{1,2}", arb_property(), 0..5)
                .prop_map(|props| Value::Object(props.into_iter().collect())),
            1 => Just(json!(["not", "an", "object"])),
            1 => Just(Value::Null),
        ];
        let required = prop_oneof![
            prop::collection::vec(prop_oneof![Just(json!("ghost")), Just(json!(3)), "[a-e]{1,2}".prop_map(Value::from)], 0..4)
                .prop_map(Value::Array),
            Just(json!("a")),
            Just(Value::Null),
        ];
        let root_type = prop_oneof![Just(None::<Value>), Just(Some(json!("object"))), Just(Some(json!(["object", "null"])))];
        let shape = prop::sample::select(vec!["inputSchema", "parameters", "root"]);

        (properties, prop::option::of(required), root_type, shape).prop_map(|(properties, required, root_type, shape)| {
            let mut schema = Map::new();
            schema.insert("properties".into(), properties);
            if let Some(r) = required {
                schema.insert("required".into(), r);
            }
            if let Some(t) = root_type {
                schema.insert("type".into(), t);
            }
            let mut descriptor = Map::new();
            descriptor.insert("name".into(), json!("tool"));
            if shape == "root" {
                descriptor.extend(schema);
            } else {
                descriptor.insert(shape.into(), Value::Object(schema));
            }
            Value::Object(descriptor)
        })
    }

    proptest! {
        #[test]
        fn test_normalization_is_idempotent_for_any_descriptor(raw in arb_descriptor()) {
            let once = normalize_schema(&raw).unwrap();
            prop_assert_eq!(&normalize_schema(&raw).unwrap(), &once);

            let twice = normalize_schema(&once.to_value()).unwrap();
            prop_assert_eq!(&twice, &once);
            for name in &once.required {
                prop_assert!(once.properties.contains_key(name));
            }
        }
    }

    #[test]
    fn test_provider_is_invoked_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let raw = RawToolDescriptor::provided(
            "search",
            SchemaProvider::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                json!({"parameters": search_schema(), "description": "Search things"})
            }),
        );

        let first = normalize(&raw).unwrap();
        let second = normalize(&raw).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.description.as_deref(), Some("Search things"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inline_descriptor_keeps_description() {
        let raw = RawToolDescriptor::inline(
            "echo",
            json!({"name": "echo", "description": "Echo text", "inputSchema": search_schema()}),
        );
        let tool = normalize(&raw).unwrap();
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.description.as_deref(), Some("Echo text"));
        assert!(tool.schema.is_required("query"));
    }
}
