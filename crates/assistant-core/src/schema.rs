//! Tool Parameter Schemas
//!
//! A JSON-schema subset (object, string, integer, number, boolean, array,
//! `enum`, `required`, `items`, `description`) used to describe tool
//! arguments. Serializes to standard JSON schema, which is also the
//! OpenAI-compatible wire form. Adapters for other providers translate from
//! this tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// JSON schema node
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct JsonSchema {
    /// Schema type; kept as text so unknown types survive a round trip
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
}

impl JsonSchema {
    fn of(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of("object")
    }

    pub fn string() -> Self {
        Self::of("string")
    }

    pub fn integer() -> Self {
        Self::of("integer")
    }

    pub fn number() -> Self {
        Self::of("number")
    }

    pub fn boolean() -> Self {
        Self::of("boolean")
    }

    pub fn array(items: Self) -> Self {
        let mut schema = Self::of("array");
        schema.items = Some(Box::new(items));
        schema
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an optional property
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Self) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a property and mark it required
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>, schema: Self) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }

    /// Restrict a string to a fixed set of values
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(|v| Value::String(v.into())).collect();
        self
    }

    /// Parse a schema from arbitrary JSON.
    ///
    /// Never fails. Each node is read field by field, so a malformed node
    /// only loses its own unreadable fields; its siblings and parent keep
    /// theirs. A type list such as `["integer", "null"]` resolves to its
    /// first non-null entry.
    pub fn from_value(value: &Value) -> Self {
        let Some(node) = value.as_object() else {
            return Self::default();
        };

        let kind = match node.get("type") {
            Some(Value::String(kind)) => Some(kind.clone()),
            Some(Value::Array(kinds)) => kinds
                .iter()
                .filter_map(Value::as_str)
                .find(|kind| *kind != "null")
                .map(str::to_string),
            _ => None,
        };

        Self {
            kind,
            description: node
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            properties: node
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, schema)| (name.clone(), Self::from_value(schema)))
                        .collect()
                })
                .unwrap_or_default(),
            required: node
                .get("required")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            enum_values: node
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            items: node
                .get("items")
                .filter(|items| items.is_object())
                .map(|items| Box::new(Self::from_value(items))),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// Enum values that are strings, in declaration order
    pub fn string_enum(&self) -> Vec<String> {
        self.enum_values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

impl From<Value> for JsonSchema {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Argument schema, normally an `object`
    pub parameters: JsonSchema,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: JsonSchema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// OpenAI-style `{"type":"function","function":{...}}` wrapper
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.to_value(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_matches_json_schema() {
        let schema = JsonSchema::object()
            .required_property("n", JsonSchema::string().one_of(["a", "b"]))
            .property("count", JsonSchema::integer().describe("How many"));

        assert_eq!(
            schema.to_value(),
            json!({
                "type": "object",
                "properties": {
                    "count": {"type": "integer", "description": "How many"},
                    "n": {"type": "string", "enum": ["a", "b"]}
                },
                "required": ["n"]
            })
        );
    }

    #[test]
    fn test_from_value_is_lenient() {
        let schema = JsonSchema::from_value(&json!({"type": "tuple", "whatever": 1}));
        assert_eq!(schema.kind.as_deref(), Some("tuple"));

        let schema = JsonSchema::from_value(&json!("not a schema"));
        assert_eq!(schema, JsonSchema::default());
    }

    #[test]
    fn test_bad_node_does_not_discard_siblings() {
        let value = json!({
            "type": "object",
            "properties": {
                "ns": {"type": "string"},
                "tail": {"type": ["integer", "null"], "description": "Lines"},
                "odd": {"type": 5, "description": "Unreadable type"}
            },
            "required": ["ns", 7]
        });
        let schema = JsonSchema::from_value(&value);

        assert_eq!(schema.kind.as_deref(), Some("object"));
        assert_eq!(schema.properties.len(), 3);
        assert_eq!(schema.required, vec!["ns"]);
        assert_eq!(schema.properties["ns"].kind.as_deref(), Some("string"));
        assert_eq!(schema.properties["tail"].kind.as_deref(), Some("integer"));
        assert_eq!(schema.properties["odd"].kind, None);
        assert_eq!(schema.properties["odd"].description.as_deref(), Some("Unreadable type"));
    }

    #[test]
    fn test_deserialize_goes_through_lenient_parser() {
        let tool: ToolSchema = serde_json::from_value(json!({
            "name": "get_pod_logs",
            "description": "Fetch logs",
            "parameters": {
                "type": "object",
                "properties": {"lines": {"type": ["integer", "null"]}}
            }
        }))
        .unwrap();
        assert_eq!(tool.parameters.properties["lines"].kind.as_deref(), Some("integer"));
    }

    #[test]
    fn test_nested_array_items() {
        let value = json!({
            "type": "array",
            "items": {"type": "object", "properties": {"x": {"type": "number"}}}
        });
        let schema = JsonSchema::from_value(&value);
        let items = schema.items.as_deref().unwrap();
        assert_eq!(items.properties["x"].kind.as_deref(), Some("number"));
        assert_eq!(schema.to_value(), value);
    }

    #[test]
    fn test_tool_schema_wire_form() {
        let tool = ToolSchema::new("list_pods", "List pods", JsonSchema::object());
        let wire = tool.to_wire();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "list_pods");
        assert_eq!(wire["function"]["parameters"]["type"], "object");
    }
}
