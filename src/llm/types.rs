use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::LlmError;

/// Structured output of the routing prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouteDecision {
    pub response: bool,
}

/// Structured output of the answering prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TextResponse {
    pub response: String,
}

/// The closed set of response shapes the gateway is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    /// `{ "response": boolean }`
    Boolean,
    /// `{ "response": string }`
    Text,
}

impl ResponseSchema {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseSchema::Boolean => "task_route",
            ResponseSchema::Text => "chat_response",
        }
    }

    /// JSON Schema document for this shape, without the `$schema` marker.
    pub fn json_schema(&self) -> Value {
        let schema = match self {
            ResponseSchema::Boolean => schemars::schema_for!(RouteDecision),
            ResponseSchema::Text => schemars::schema_for!(TextResponse),
        };
        let mut value = schema.to_value();
        if let Some(map) = value.as_object_mut() {
            map.remove("$schema");
        }
        value
    }

    /// Checks a parsed model output against this schema.
    pub fn validate(&self, output: &Value) -> Result<(), LlmError> {
        let schema = self.json_schema();
        let validator = jsonschema::validator_for(&schema).map_err(LlmError::schema)?;
        let errors: Vec<String> = validator
            .iter_errors(output)
            .map(|err| err.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LlmError::SchemaValidation(format!(
                "{} output rejected: {}",
                self.name(),
                errors.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_schema_requires_boolean_response() {
        let schema = ResponseSchema::Boolean;
        assert!(schema.validate(&json!({ "response": true })).is_ok());

        let err = schema.validate(&json!({ "response": "yes" })).unwrap_err();
        assert!(matches!(err, LlmError::SchemaValidation(_)));

        assert!(schema.validate(&json!({})).is_err());
    }

    #[test]
    fn text_schema_rejects_extra_fields() {
        let schema = ResponseSchema::Text;
        assert!(schema.validate(&json!({ "response": "hola" })).is_ok());
        assert!(schema
            .validate(&json!({ "response": "hola", "extra": 1 }))
            .is_err());
    }

    #[test]
    fn schema_document_has_no_meta_marker() {
        let schema = ResponseSchema::Text.json_schema();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].get("response").is_some());
    }
}
