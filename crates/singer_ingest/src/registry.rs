use std::collections::HashMap;

use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

use crate::message::SchemaMessage;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("schema for stream `{stream}` does not compile: {message}")]
pub struct InvalidSchema {
    pub stream: String,
    pub message: String,
}

/// The schema most recently declared for one stream, compiled and ready to validate against.
#[derive(Debug)]
pub struct RegisteredSchema {
    stream: String,
    schema: Value,
    key_properties: Vec<String>,
    bookmark_properties: Option<Vec<String>>,
    compiled: JSONSchema,
}

impl RegisteredSchema {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn key_properties(&self) -> &[String] {
        &self.key_properties
    }

    pub fn bookmark_properties(&self) -> Option<&[String]> {
        self.bookmark_properties.as_deref()
    }

    pub(crate) fn compiled(&self) -> &JSONSchema {
        &self.compiled
    }
}

/// Stream name → latest declared schema. Redeclaring a stream replaces its entry; entries are
/// never removed for the lifetime of a run.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, RegisteredSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and stores `message.schema` for `message.stream`.
    ///
    /// A schema that fails to compile leaves any earlier entry for the stream in place.
    pub fn declare(&mut self, message: SchemaMessage) -> Result<&RegisteredSchema, InvalidSchema> {
        let SchemaMessage {
            stream,
            schema,
            key_properties,
            bookmark_properties,
        } = message;
        let schema = Value::Object(schema);
        let compiled = JSONSchema::options()
            .compile(&schema)
            .map_err(|err| InvalidSchema {
                stream: stream.clone(),
                message: err.to_string(),
            })?;

        let entry = RegisteredSchema {
            stream: stream.clone(),
            schema,
            key_properties,
            bookmark_properties,
            compiled,
        };
        self.schemas.insert(stream.clone(), entry);
        Ok(&self.schemas[&stream])
    }

    pub fn lookup(&self, stream: &str) -> Option<&RegisteredSchema> {
        self.schemas.get(stream)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn streams(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_message(stream: &str, schema: Value, keys: &[&str]) -> SchemaMessage {
        let Value::Object(schema) = schema else {
            panic!("schema fixture must be an object");
        };
        SchemaMessage {
            stream: stream.to_string(),
            schema,
            key_properties: keys.iter().map(|k| k.to_string()).collect(),
            bookmark_properties: None,
        }
    }

    #[test]
    fn redeclaration_overwrites() {
        let mut registry = SchemaRegistry::new();
        registry
            .declare(schema_message("s", json!({"type": "object"}), &["a"]))
            .unwrap();
        registry
            .declare(schema_message("s", json!({"type": "array"}), &["b"]))
            .unwrap();

        assert_eq!(registry.len(), 1);
        let entry = registry.lookup("s").unwrap();
        assert_eq!(entry.schema(), &json!({"type": "array"}));
        assert_eq!(entry.key_properties(), ["b".to_string()]);
        assert!(registry.lookup("other").is_none());
    }

    #[test]
    fn uncompilable_schema_keeps_previous_entry() {
        let mut registry = SchemaRegistry::new();
        registry
            .declare(schema_message("s", json!({"type": "object"}), &[]))
            .unwrap();
        let err = registry
            .declare(schema_message("s", json!({"type": 12}), &[]))
            .unwrap_err();

        assert_eq!(err.stream, "s");
        assert_eq!(
            registry.lookup("s").unwrap().schema(),
            &json!({"type": "object"})
        );
    }

    #[test]
    fn streams_lists_every_declared_name() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.is_empty());
        for stream in ["a", "b", "a"] {
            registry
                .declare(schema_message(stream, json!({}), &[]))
                .unwrap();
        }
        let mut streams: Vec<_> = registry.streams().collect();
        streams.sort_unstable();
        assert_eq!(streams, vec!["a", "b"]);
    }
}
