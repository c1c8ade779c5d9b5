//! Response schemas: the declared JSON shape for each operation.
//!
//! A [`Schema`] is serialized into the request (Gemini's OpenAPI subset:
//! uppercase type names, `required`, `enum`, `propertyOrdering`) and is reused
//! afterwards by [`enforce`] to check what actually came back. The model is
//! asked to honour the schema; nothing guarantees it does.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::llm_client::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    String,
    Integer,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    /// Declaration order of `properties`; Gemini otherwise emits keys alphabetically.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub property_ordering: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Schema {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            enum_values: Vec::new(),
            minimum: None,
            maximum: None,
            items: None,
            properties: BTreeMap::new(),
            property_ordering: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    /// Shorthand for an array of strings, the most common field shape here.
    pub fn string_list() -> Self {
        Self::array(Self::string())
    }

    /// A string restricted to the given values.
    pub fn enumeration(values: &[&str]) -> Self {
        Self {
            enum_values: values.iter().map(|v| v.to_string()).collect(),
            ..Self::string()
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn at_least(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Adds an optional property.
    pub fn property(mut self, name: &str, schema: Schema) -> Self {
        if self.properties.insert(name.to_string(), schema).is_none() {
            self.property_ordering.push(name.to_string());
        }
        self
    }

    /// Adds a property the response must contain.
    pub fn required_property(mut self, name: &str, schema: Schema) -> Self {
        self = self.property(name, schema);
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn to_value(&self) -> Value {
        // Serializing plain strings, numbers, and maps cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A result type that knows its own response schema.
pub trait StructuredOutput: DeserializeOwned {
    fn response_schema() -> Schema;
}

impl<T: StructuredOutput> StructuredOutput for Vec<T> {
    fn response_schema() -> Schema {
        Schema::array(T::response_schema())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enforcement
// ────────────────────────────────────────────────────────────────────────────

/// Checks `value` against `schema` and normalizes it for deserialization.
///
/// Rejects missing required properties, wrong primitive types, values outside
/// an enum, and numbers outside declared bounds. Optional properties that came
/// back as `null` are dropped, and whole-valued floats under an INTEGER schema
/// (`85.0`) are rewritten as integers. Unknown properties are left alone.
pub fn enforce(value: &mut Value, schema: &Schema) -> Result<(), GenerationError> {
    enforce_at(value, schema, "$")
}

fn violation(path: &str, reason: impl Into<String>) -> GenerationError {
    GenerationError::SchemaViolation {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn enforce_at(value: &mut Value, schema: &Schema, path: &str) -> Result<(), GenerationError> {
    match schema.kind {
        SchemaType::String => {
            let Some(s) = value.as_str() else {
                return Err(violation(path, format!("expected string, got {}", type_name(value))));
            };
            if !schema.enum_values.is_empty() && !schema.enum_values.iter().any(|v| v == s) {
                return Err(violation(
                    path,
                    format!("`{s}` is not one of [{}]", schema.enum_values.join(", ")),
                ));
            }
        }
        SchemaType::Integer => {
            let n = value
                .as_i64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .ok_or_else(|| {
                    violation(path, format!("expected integer, got {}", describe(value)))
                })?;
            check_bounds(n as f64, schema, path)?;
            *value = Value::Number(Number::from(n));
        }
        SchemaType::Array => {
            let found = type_name(value);
            let Some(items) = value.as_array_mut() else {
                return Err(violation(path, format!("expected array, got {found}")));
            };
            if let Some(item_schema) = &schema.items {
                for (i, item) in items.iter_mut().enumerate() {
                    enforce_at(item, item_schema, &format!("{path}[{i}]"))?;
                }
            }
        }
        SchemaType::Object => {
            let found = type_name(value);
            let Some(map) = value.as_object_mut() else {
                return Err(violation(path, format!("expected object, got {found}")));
            };
            for name in &schema.required {
                if map.get(name).map_or(true, Value::is_null) {
                    return Err(violation(&format!("{path}.{name}"), "required field is missing"));
                }
            }
            for (name, property) in &schema.properties {
                if map.get(name).is_some_and(Value::is_null) {
                    map.remove(name);
                }
                if let Some(field) = map.get_mut(name) {
                    enforce_at(field, property, &format!("{path}.{name}"))?;
                }
            }
        }
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {n}"),
        other => type_name(other).to_string(),
    }
}

fn check_bounds(n: f64, schema: &Schema, path: &str) -> Result<(), GenerationError> {
    if let Some(min) = schema.minimum {
        if n < min {
            return Err(violation(path, format!("{n} is below minimum {min}")));
        }
    }
    if let Some(max) = schema.maximum {
        if n > max {
            return Err(violation(path, format!("{n} is above maximum {max}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::object()
            .required_property("name", Schema::string())
            .required_property("score", Schema::integer().range(0.0, 100.0))
            .property("email", Schema::string())
            .property("tags", Schema::string_list())
            .property("level", Schema::enumeration(&["easy", "hard"]))
    }

    #[test]
    fn test_schema_serializes_in_gemini_dialect() {
        let value = person().to_value();
        assert_eq!(value["type"], "OBJECT");
        assert_eq!(value["properties"]["name"]["type"], "STRING");
        assert_eq!(value["properties"]["tags"]["type"], "ARRAY");
        assert_eq!(value["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(value["properties"]["score"]["minimum"], 0.0);
        assert_eq!(value["properties"]["level"]["enum"], json!(["easy", "hard"]));
        assert_eq!(value["required"], json!(["name", "score"]));
        assert_eq!(
            value["propertyOrdering"],
            json!(["name", "score", "email", "tags", "level"])
        );
        assert!(value["properties"]["name"].get("enum").is_none());
        assert!(value["properties"]["name"].get("description").is_none());
    }

    #[test]
    fn test_enforce_accepts_conforming_value() {
        let mut value = json!({
            "name": "Ada",
            "score": 91,
            "email": "ada@example.com",
            "tags": ["rust"],
            "level": "hard",
            "unknown": true
        });
        enforce(&mut value, &person()).unwrap();
        assert_eq!(value["unknown"], true);
    }

    #[test]
    fn test_enforce_reports_missing_required_field_path() {
        let mut value = json!({"name": "Ada"});
        let err = enforce(&mut value, &person()).unwrap_err();
        match err {
            GenerationError::SchemaViolation { path, .. } => assert_eq!(path, "$.score"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enforce_treats_null_required_field_as_missing() {
        let mut value = json!({"name": null, "score": 10});
        assert!(enforce(&mut value, &person()).is_err());
    }

    #[test]
    fn test_enforce_drops_null_optional_field() {
        let mut value = json!({"name": "Ada", "score": 10, "email": null});
        enforce(&mut value, &person()).unwrap();
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_enforce_rewrites_whole_float_as_integer() {
        let mut value = json!({"name": "Ada", "score": 85.0});
        enforce(&mut value, &person()).unwrap();
        assert_eq!(value["score"], json!(85));
        assert!(value["score"].is_i64());
    }

    #[test]
    fn test_enforce_rejects_fractional_integer() {
        let mut value = json!({"name": "Ada", "score": 85.5});
        let err = enforce(&mut value, &person()).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn test_enforce_rejects_out_of_range_score() {
        let mut value = json!({"name": "Ada", "score": 140});
        let err = enforce(&mut value, &person()).unwrap_err();
        assert!(err.to_string().contains("above maximum"));
    }

    #[test]
    fn test_enforce_rejects_value_outside_enum() {
        let mut value = json!({"name": "Ada", "score": 1, "level": "medium"});
        let err = enforce(&mut value, &person()).unwrap_err();
        match err {
            GenerationError::SchemaViolation { path, reason } => {
                assert_eq!(path, "$.level");
                assert!(reason.contains("medium"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enforce_indexes_array_items_in_path() {
        let schema = Schema::array(person());
        let mut value = json!([
            {"name": "Ada", "score": 1},
            {"name": "Bob", "score": "high"}
        ]);
        let err = enforce(&mut value, &schema).unwrap_err();
        match err {
            GenerationError::SchemaViolation { path, .. } => assert_eq!(path, "$[1].score"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enforce_rejects_wrong_top_level_shape() {
        let mut value = json!([]);
        let err = enforce(&mut value, &person()).unwrap_err();
        assert!(err.to_string().contains("expected object, got array"));
    }

    #[test]
    fn test_enforce_rejects_non_string_list_items() {
        let mut value = json!({"name": "Ada", "score": 3, "tags": ["ok", 7]});
        let err = enforce(&mut value, &person()).unwrap_err();
        assert!(err.to_string().contains("$.tags[1]"));
    }
}
