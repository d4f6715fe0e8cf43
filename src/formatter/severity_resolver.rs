//! Per-topic severity lookup.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    event::normalise_pointer,
    schema::{TopicMetadata, audit_event_schema, generate_json_pointers},
    severity::Severity,
};

/// Names the event field carrying the syslog severity for a topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityFieldMapping {
    pub topic: String,
    /// Field name or JSON pointer; a leading `/` is implied.
    pub field: String,
}

impl SeverityFieldMapping {
    pub fn new(topic: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            field: field.into(),
        }
    }
}

/// Resolves the severity of an event from its topic's mapped field.
///
/// Mappings are validated against the topic schemas once, at construction.
/// Invalid or duplicate mappings are logged and discarded so format calls
/// never fail on account of configuration.
#[derive(Clone, Debug, Default)]
pub struct SeverityResolver {
    fields: HashMap<String, String>,
}

impl SeverityResolver {
    pub fn new(mappings: &[SeverityFieldMapping], metadata: &dyn TopicMetadata) -> Self {
        let mut fields = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            if fields.contains_key(&mapping.topic) {
                warn!(
                    "Multiple syslog severity field mappings defined for {} topic",
                    mapping.topic
                );
                continue;
            }
            let known = metadata.contains_topic(&mapping.topic);
            let Some(topic_metadata) = metadata.metadata(&mapping.topic).filter(|_| known) else {
                warn!(
                    "Syslog severity field mapping defined for unknown topic {}",
                    mapping.topic
                );
                continue;
            };
            let schema = match audit_event_schema(topic_metadata) {
                Ok(schema) => schema,
                Err(err) => {
                    warn!(
                        "Ignoring syslog severity field mapping for topic {}: {err}",
                        mapping.topic
                    );
                    continue;
                }
            };
            let pointer = normalise_pointer(&mapping.field);
            if !generate_json_pointers(schema).contains(&pointer) {
                warn!(
                    "Syslog severity field mapping for topic {} references unknown field {}",
                    mapping.topic, mapping.field
                );
                continue;
            }
            fields.insert(mapping.topic.clone(), pointer);
        }
        Self { fields }
    }

    /// Pointer of the severity field retained for `topic`.
    pub fn mapped_field(&self, topic: &str) -> Option<&str> {
        self.fields.get(topic).map(String::as_str)
    }

    /// Severity of `event`, defaulting to [`Severity::Informational`].
    pub fn resolve(&self, topic: &str, event: &Value) -> Severity {
        let Some(pointer) = self.fields.get(topic) else {
            return Severity::Informational;
        };
        match event.pointer(pointer) {
            None | Some(Value::Null) => {
                debug!("{pointer} value not set; defaulting to INFORMATIONAL syslog severity");
                Severity::Informational
            }
            Some(Value::String(name)) => name.parse().unwrap_or_else(|_| {
                debug!("{name} is not a valid syslog severity; defaulting to INFORMATIONAL");
                Severity::Informational
            }),
            Some(other) => {
                debug!("{other} is not a valid syslog severity; defaulting to INFORMATIONAL");
                Severity::Informational
            }
        }
    }
}
