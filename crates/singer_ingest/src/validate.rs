use serde_json::Value;

use crate::error::SingerError;
use crate::registry::{RegisteredSchema, SchemaRegistry};

const UNKNOWN_VIOLATION: &str = "Unknown Violation";

/// Outcome of checking one instance against a schema.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub message: Option<String>,
}

impl Validation {
    fn valid() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }
}

impl RegisteredSchema {
    /// Validates `instance`, collecting every violation into one message sorted by instance path.
    pub fn validate(&self, instance: &Value) -> Validation {
        let Err(errors) = self.compiled().validate(instance) else {
            return Validation::valid();
        };
        let mut errs = errors
            .map(|e| (e.instance_path.to_string(), e.to_string()))
            .collect::<Vec<_>>();
        errs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let message = errs
            .into_iter()
            .map(|(ptr, msg)| {
                if ptr.is_empty() {
                    msg
                } else {
                    format!("{ptr}: {msg}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        Validation {
            valid: false,
            message: (!message.is_empty()).then_some(message),
        }
    }
}

/// Checks a record payload against the schema currently registered for `stream`.
///
/// Streams without a declared schema pass unvalidated.
pub fn validate_record(
    registry: &SchemaRegistry,
    line_number: usize,
    stream: &str,
    payload: &Value,
) -> Result<(), SingerError> {
    let Some(schema) = registry.lookup(stream) else {
        return Ok(());
    };
    let validation = schema.validate(payload);
    if validation.valid {
        return Ok(());
    }
    Err(SingerError::SchemaViolation {
        line_number,
        stream: stream.to_string(),
        message: validation
            .message
            .unwrap_or_else(|| UNKNOWN_VIOLATION.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SchemaMessage;
    use serde_json::json;

    fn registry_with(stream: &str, schema: Value) -> SchemaRegistry {
        let Value::Object(schema) = schema else {
            panic!("schema fixture must be an object");
        };
        let mut registry = SchemaRegistry::new();
        registry
            .declare(SchemaMessage {
                stream: stream.to_string(),
                schema,
                key_properties: Vec::new(),
                bookmark_properties: None,
            })
            .unwrap();
        registry
    }

    #[test]
    fn undeclared_streams_pass_through() {
        let registry = registry_with("s", json!({"type": "object", "required": ["id"]}));
        assert!(validate_record(&registry, 1, "other", &json!({})).is_ok());
    }

    #[test]
    fn conforming_payload_is_valid() {
        let registry = registry_with(
            "s",
            json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        );
        assert!(validate_record(&registry, 1, "s", &json!({"a": 1.5})).is_ok());
    }

    #[test]
    fn violation_reports_stream_and_path() {
        let registry = registry_with(
            "s",
            json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        );
        let err = validate_record(&registry, 9, "s", &json!({"a": "x"})).unwrap_err();
        match err {
            SingerError::SchemaViolation {
                line_number,
                stream,
                message,
            } => {
                assert_eq!(line_number, 9);
                assert_eq!(stream, "s");
                assert!(message.starts_with("/a: "), "{message}");
                assert!(message.contains("number"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn multiple_violations_are_sorted_by_path() {
        let registry = registry_with(
            "s",
            json!({
                "type": "object",
                "properties": {"b": {"type": "string"}, "a": {"type": "integer"}}
            }),
        );
        let schema = registry.lookup("s").unwrap();
        let validation = schema.validate(&json!({"b": 1, "a": "one"}));
        assert!(!validation.valid);
        let message = validation.message.unwrap();
        let a = message.find("/a:").unwrap();
        let b = message.find("/b:").unwrap();
        assert!(a < b, "{message}");
    }

    #[test]
    fn additional_properties_violation_is_reported_at_root() {
        let registry = registry_with(
            "test",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {"b": {"type": "number"}}
            }),
        );
        let err = validate_record(&registry, 3, "test", &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, SingerError::SchemaViolation { .. }));
    }
}
