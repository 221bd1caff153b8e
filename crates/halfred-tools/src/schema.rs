//! Tool definitions and schema normalization.
//!
//! The realtime model rejects tool schemas whose top level is anything other
//! than a plain object. Tool servers regularly publish union schemas
//! (`anyOf` over "type text" / "type keys" variants and the like), so every
//! schema is flattened once, at registration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level combinators collapsed by [`normalize_tool_schema`]. Only the
/// first one present is merged.
const COMBINATORS: &[&str] = &["anyOf", "oneOf", "allOf"];

/// Top-level keywords the realtime model refuses outright.
const FORBIDDEN: &[&str] = &["enum", "not"];

/// Normalize a tool input schema into a top-level object schema.
///
/// - The first top-level `anyOf`/`oneOf`/`allOf` is removed and the
///   properties of its variants are merged in. On a name clash the first
///   variant wins, and properties already declared at the top level win over
///   all variants.
/// - `required` is dropped when a combinator was merged, since it would force
///   members of different variants together.
/// - Top-level `enum` and `not` are dropped.
/// - `type` is forced to `"object"` and `properties` always exists.
///
/// A non-object input is treated as an empty schema.
#[must_use]
pub fn normalize_tool_schema(schema: Value) -> Value {
    let mut fixed = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    if let Some(combinator) = COMBINATORS.iter().find(|c| fixed.contains_key(**c)) {
        let variants = fixed.remove(*combinator).unwrap_or(Value::Null);
        fixed.remove("required");

        let mut properties = merge_variant_properties(&variants);
        if let Some(Value::Object(base)) = fixed.remove("properties") {
            properties.extend(base);
        }
        debug!(
            combinator,
            properties = properties.len(),
            "flattened top-level schema combinator"
        );
        fixed.insert("properties".to_string(), Value::Object(properties));
    }

    for keyword in FORBIDDEN {
        fixed.remove(*keyword);
    }

    fixed.insert("type".to_string(), Value::String("object".to_string()));
    if !fixed.contains_key("properties") {
        fixed.insert("properties".to_string(), Value::Object(Map::new()));
    }

    Value::Object(fixed)
}

fn merge_variant_properties(variants: &Value) -> Map<String, Value> {
    let mut merged = Map::new();
    let Some(variants) = variants.as_array() else {
        return merged;
    };
    let variant_properties = variants
        .iter()
        .filter_map(|v| v.get("properties"))
        .filter_map(Value::as_object);
    for properties in variant_properties {
        for (name, schema) in properties {
            if !merged.contains_key(name) {
                merged.insert(name.clone(), schema.clone());
            }
        }
    }
    merged
}

/// A tool as presented to the realtime model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Input JSON schema, always normalized.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: normalize_tool_schema(Value::Null),
        }
    }

    /// Set description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set input schema. The schema is normalized.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = normalize_tool_schema(schema);
        self
    }
}
