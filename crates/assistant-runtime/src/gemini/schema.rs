//! Gemini schema dialect
//!
//! Gemini accepts an OpenAPI subset with upper-case type names and string
//! enums only. Translation is total: an unknown or missing type becomes
//! `STRING`.

use std::collections::BTreeMap;

use assistant_core::schema::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeminiType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl GeminiType {
    pub fn from_canonical(kind: Option<&str>) -> Self {
        match kind {
            Some("object") => Self::Object,
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array,
            _ => Self::String,
        }
    }

    pub const fn canonical(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeminiSchema {
    #[serde(rename = "type", default)]
    pub kind: GeminiType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, GeminiSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<GeminiSchema>>,
}

/// Canonical schema to Gemini
pub fn to_gemini(schema: &JsonSchema) -> GeminiSchema {
    let kind = GeminiType::from_canonical(schema.kind.as_deref());
    let enum_values = schema.string_enum();
    let mut out = GeminiSchema {
        kind,
        format: (!enum_values.is_empty()).then(|| "enum".to_string()),
        description: schema.description.clone(),
        enum_values,
        ..GeminiSchema::default()
    };

    match kind {
        GeminiType::Object => {
            out.properties = schema
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), to_gemini(prop)))
                .collect();
            out.required = schema.required.clone();
        }
        GeminiType::Array => {
            // ARRAY without items is rejected, so default to strings
            let items = schema.items.as_deref().map_or_else(GeminiSchema::default, to_gemini);
            out.items = Some(Box::new(items));
        }
        _ => {}
    }
    out
}

/// Gemini schema back to canonical form
pub fn from_gemini(schema: &GeminiSchema) -> JsonSchema {
    JsonSchema {
        kind: Some(schema.kind.canonical().to_string()),
        description: schema.description.clone(),
        properties: schema
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), from_gemini(prop)))
            .collect(),
        required: schema.required.clone(),
        enum_values: schema.enum_values.iter().cloned().map(Value::String).collect(),
        items: schema.items.as_deref().map(|i| Box::new(from_gemini(i))),
    }
}

/// Whether a declaration should carry `parameters` at all.
///
/// Gemini rejects OBJECT schemas with no properties.
pub fn has_parameters(schema: &GeminiSchema) -> bool {
    schema.kind != GeminiType::Object || !schema.properties.is_empty()
}
