//! Topic metadata and schema helpers.
//!
//! The host application owns the audit topic schemas; this crate only reads
//! them through [`TopicMetadata`]. Topic metadata follows the audit framework
//! layout, i.e. the JSON schema sits under a top-level `schema` key:
//!
//! ```json
//! {"schema": {"properties": {"_id": {"type": "string"}, "userId": {"type": "string"}}}}
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;

/// Errors raised while reading a topic's metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The metadata has no `schema` object.
    #[error("topic metadata has no 'schema' object")]
    MissingSchema,
    /// The schema has no `properties` object.
    #[error("topic schema has no 'properties' object")]
    MissingProperties,
}

/// Read-only provider of per-topic schema metadata.
pub trait TopicMetadata: Send + Sync {
    /// Whether `topic` has registered metadata.
    fn contains_topic(&self, topic: &str) -> bool;

    /// Metadata for `topic`, if registered.
    fn metadata(&self, topic: &str) -> Option<&Value>;

    /// Every registered topic.
    fn topics(&self) -> BTreeSet<String>;
}

/// In-memory [`TopicMetadata`] backed by a sorted map.
#[derive(Clone, Debug, Default)]
pub struct StaticTopicMetadata {
    topics: BTreeMap<String, Value>,
}

impl StaticTopicMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the metadata for `topic`.
    pub fn with_topic(mut self, topic: impl Into<String>, metadata: Value) -> Self {
        self.topics.insert(topic.into(), metadata);
        self
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for StaticTopicMetadata {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            topics: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl TopicMetadata for StaticTopicMetadata {
    fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    fn metadata(&self, topic: &str) -> Option<&Value> {
        self.topics.get(topic)
    }

    fn topics(&self) -> BTreeSet<String> {
        self.topics.keys().cloned().collect()
    }
}

/// Extract the JSON schema from topic metadata.
pub fn audit_event_schema(metadata: &Value) -> Result<&Value, SchemaError> {
    let schema = metadata
        .get("schema")
        .filter(|schema| schema.is_object())
        .ok_or(SchemaError::MissingSchema)?;
    if !schema.get("properties").is_some_and(Value::is_object) {
        return Err(SchemaError::MissingProperties);
    }
    Ok(schema)
}

/// Collect a JSON pointer for every leaf property reachable in `schema`.
///
/// Properties that declare nested `properties` are descended into; anything
/// else is a leaf. The result is sorted, which gives formatters a stable
/// field order.
pub fn generate_json_pointers(schema: &Value) -> BTreeSet<String> {
    let mut pointers = BTreeSet::new();
    collect_pointers(schema, "", &mut pointers);
    pointers
}

fn collect_pointers(schema: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, property) in properties {
        let pointer = format!("{prefix}/{}", escape_token(name));
        if property.get("properties").is_some_and(Value::is_object) {
            collect_pointers(property, &pointer, out);
        } else {
            out.insert(pointer);
        }
    }
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generates_leaf_pointers() {
        let schema = json!({
            "properties": {
                "_id": {"type": "string"},
                "userId": {"type": "string"},
                "http": {
                    "type": "object",
                    "properties": {
                        "method": {"type": "string"},
                        "path": {"type": "string"}
                    }
                },
                "roles": {"type": "array", "items": {"type": "string"}}
            }
        });
        let pointers: Vec<_> = generate_json_pointers(&schema).into_iter().collect();
        assert_eq!(
            pointers,
            vec!["/_id", "/http/method", "/http/path", "/roles", "/userId"]
        );
    }

    #[test]
    fn escapes_pointer_tokens() {
        let schema = json!({"properties": {"a/b": {}, "c~d": {}}});
        let pointers = generate_json_pointers(&schema);
        assert!(pointers.contains("/a~1b"));
        assert!(pointers.contains("/c~0d"));
    }

    #[test]
    fn extracts_schema_from_metadata() {
        let metadata = json!({"schema": {"properties": {"x": {}}}});
        let schema = audit_event_schema(&metadata).expect("well-formed metadata");
        assert!(schema.get("properties").is_some());
    }

    #[test]
    fn rejects_malformed_metadata() {
        assert_eq!(
            audit_event_schema(&json!({"properties": {}})),
            Err(SchemaError::MissingSchema)
        );
        assert_eq!(
            audit_event_schema(&json!({"schema": "nope"})),
            Err(SchemaError::MissingSchema)
        );
        assert_eq!(
            audit_event_schema(&json!({"schema": {"type": "object"}})),
            Err(SchemaError::MissingProperties)
        );
    }

    #[test]
    fn static_metadata_lists_topics() {
        let metadata = StaticTopicMetadata::new()
            .with_topic("access", json!({}))
            .with_topic("activity", json!({}));
        assert!(metadata.contains_topic("access"));
        assert!(!metadata.contains_topic("config"));
        assert_eq!(
            metadata.topics().into_iter().collect::<Vec<_>>(),
            vec!["access", "activity"]
        );
    }
}
