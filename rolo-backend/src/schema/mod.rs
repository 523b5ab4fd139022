//! Object schemas and validation
//!
//! One schema shape serves two purposes: it is serialized verbatim as the
//! JSON Schema the model sees for tool inputs, and it drives validation of
//! the records the model sends back. Validation rejects; it never coerces or
//! defaults a missing required field.

pub mod records;

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON Schema property definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn new(schema_type: &str, description: &str) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.to_string(),
            items: None,
            enum_values: None,
        }
    }

    pub fn array_of(items: PropertySchema, description: &str) -> Self {
        PropertySchema {
            schema_type: "array".to_string(),
            description: description.to_string(),
            items: Some(Box::new(items)),
            enum_values: None,
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Object schema: property map plus required key list. BTreeMap keeps the
/// serialized property order stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        ObjectSchema {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: vec![],
        }
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn require(mut self, name: &str, schema: PropertySchema) -> Self {
        self.required.push(name.to_string());
        self.properties.insert(name.to_string(), schema);
        self
    }
}

/// Check whether a value matches a declared property type. Unknown type
/// names are accepted so a schema typo never rejects good data.
fn type_matches(value: &Value, schema_type: &str) -> bool {
    match schema_type {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

/// Validate a parsed value against an object schema. Collects every failing
/// field (missing required, or present with the wrong type) instead of
/// stopping at the first.
pub fn validate(value: &Value, schema: &ObjectSchema) -> Result<(), ValidationError> {
    let obj = match value.as_object() {
        Some(o) => o,
        None => {
            return Err(ValidationError::new(vec!["(root: expected object)".to_string()]));
        }
    };

    let mut failing: Vec<String> = Vec::new();

    for key in &schema.required {
        match obj.get(key) {
            None | Some(Value::Null) => failing.push(key.clone()),
            Some(_) => {}
        }
    }

    for (key, prop) in &schema.properties {
        if let Some(v) = obj.get(key) {
            if !v.is_null() && !type_matches(v, &prop.schema_type) {
                failing.push(format!("{} (expected {})", key, prop.schema_type));
            }
        }
    }

    if failing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(failing))
    }
}
