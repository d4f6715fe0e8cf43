//! RFC 5424 STRUCTURED-DATA rendering for a single topic.

use std::fmt::Write;

use serde_json::Value;

use crate::{
    event::{self, pointer_to_dot_notation, value_as_string},
    schema::{SchemaError, audit_event_schema, generate_json_pointers},
};

/// IANA private enterprise number embedded in every SD-ID.
pub const ENTERPRISE_ID: &str = "36733";

/// Housekeeping fields rendered elsewhere in the message.
const IGNORED_FIELDS: [&str; 3] = [event::ID, event::TIMESTAMP, event::EVENT_NAME];

#[derive(Clone, Debug, PartialEq, Eq)]
struct Field {
    pointer: String,
    name: String,
}

/// Renders an event's schema fields as one SD-ELEMENT.
///
/// Built once per topic and immutable afterwards. Fields are emitted in
/// pointer order; absent or `null` values render as empty strings so the
/// element always lists every schema field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredDataFormatter {
    id: String,
    fields: Vec<Field>,
}

impl StructuredDataFormatter {
    /// Build the formatter for `topic` from its metadata.
    pub fn new(product_name: &str, topic: &str, metadata: &Value) -> Result<Self, SchemaError> {
        let schema = audit_event_schema(metadata)?;
        let fields = generate_json_pointers(schema)
            .into_iter()
            .map(|pointer| Field {
                name: pointer_to_dot_notation(&pointer),
                pointer,
            })
            .filter(|field| !IGNORED_FIELDS.contains(&field.name.as_str()))
            .collect();
        Ok(Self {
            id: format!("{topic}.{product_name}@{ENTERPRISE_ID}"),
            fields,
        })
    }

    /// The SD-ID, `{topic}.{product}@{enterprise}`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// JSON pointers of the rendered fields, in output order.
    pub fn field_pointers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.pointer.as_str())
    }

    pub fn format(&self, event: &Value) -> String {
        let mut sd = String::with_capacity(self.id.len() + 2 + self.fields.len() * 24);
        sd.push('[');
        sd.push_str(&self.id);
        for field in &self.fields {
            let value = value_as_string(event, &field.pointer).unwrap_or_default();
            let _ = write!(sd, " {}=\"{}\"", field.name, escape_param_value(&value));
        }
        sd.push(']');
        sd
    }
}

/// Escape `\`, `"` and `]` with a leading backslash.
pub fn escape_param_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
