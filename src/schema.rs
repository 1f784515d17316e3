//! JSON-Schema Draft-4 validation (C1).
//!
//! Mirrors the `SchemaValidated` mixin of the source this spec was distilled
//! from: no schema means "accept everything"; a schema means every input
//! must validate against it before the caller proceeds.

use crate::error::LoadError;
use jsonschema::JSONSchema;
use serde_json::Value;

/// Wraps a compiled Draft-4 schema, or no schema at all.
pub struct SchemaValidator {
    compiled: Option<JSONSchema>,
}

impl SchemaValidator {
    /// Compile `spec` (if present) at load time. A malformed schema fails
    /// the whole load, per §7's LoadError taxonomy.
    pub fn new(spec: Option<&Value>) -> Result<Self, LoadError> {
        let compiled = match spec {
            None => None,
            Some(Value::Null) => None,
            Some(schema) => {
                let compiled = JSONSchema::options()
                    .with_draft(jsonschema::Draft::Draft4)
                    .compile(schema)
                    .map_err(|e| LoadError::InvalidSchema(e.to_string()))?;
                Some(compiled)
            }
        };
        Ok(Self { compiled })
    }

    /// No validator compiled means every input is accepted.
    pub fn check(&self, input: &Value) -> Result<(), String> {
        match &self.compiled {
            None => Ok(()),
            Some(schema) => schema.validate(input).map_err(|errors| {
                errors
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_schema_accepts_everything() {
        let validator = SchemaValidator::new(None).unwrap();
        assert!(validator.check(&json!({"anything": 1})).is_ok());
        assert!(validator.check(&Value::Null).is_ok());
    }

    #[test]
    fn schema_rejects_invalid_input() {
        let spec = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        let validator = SchemaValidator::new(Some(&spec)).unwrap();
        assert!(validator.check(&json!({"name": "hi"})).is_ok());
        assert!(validator.check(&json!({})).is_err());
    }

    #[test]
    fn malformed_schema_fails_to_compile() {
        let spec = json!({"type": "not-a-real-type"});
        let result = SchemaValidator::new(Some(&spec));
        assert!(result.is_err());
    }
}
