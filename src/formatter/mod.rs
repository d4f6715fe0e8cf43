//! Encoding of audit events as CEF-over-syslog messages.
//!
//! [`SyslogFormatter`] is the top-level encoder. It owns one
//! [`StructuredDataFormatter`] per known topic and a validated
//! [`SeverityResolver`], all built once from topic metadata and never mutated
//! afterwards, so a single instance can be shared across producer threads.
//!
//! The produced line has the shape
//!
//! ```text
//! <date> CEF:0|ForgeRock Inc|<product>|1.0|<priority>|forgerock cef|<severity>| src=<addr> act=<eventName> targetType=<hostname> procId=<pid> msg=<structured-data>
//! ```

use std::{collections::HashMap, fmt, fmt::Write, sync::Arc};

use chrono::Local;
use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

use crate::{
    event::{self, top_level_str},
    facility::Facility,
    providers::{NIL_VALUE, Providers},
    schema::TopicMetadata,
    severity::Severity,
};

mod severity_resolver;
mod structured_data;

pub use severity_resolver::{SeverityFieldMapping, SeverityResolver};
pub use structured_data::{ENTERPRISE_ID, StructuredDataFormatter, escape_param_value};

/// CEF format version marker.
pub const CEF_VERSION: &str = "CEF:0";
/// Device vendor header field.
pub const VENDOR: &str = "ForgeRock Inc";
/// Device version header field.
pub const SCHEME_VERSION: &str = "1.0";
/// Event class label header field.
pub const TYPE_LABEL: &str = "forgerock cef";
/// `strftime` pattern for the leading date, e.g. `05 January 14:03:22`.
pub const DATE_FORMAT: &str = "%d %B %H:%M:%S";

/// Errors raised while formatting an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// No schema was registered for the topic at construction.
    #[error("unknown event topic '{0}'")]
    UnknownTopic(String),
}

/// Trait for encoding audit events into wire messages.
///
/// Implementors must be thread-safe (`Send + Sync`) so one encoder can serve
/// every producer thread.
pub trait EventFormatter: Send + Sync {
    /// Whether events of `topic` can be formatted.
    fn can_format(&self, topic: &str) -> bool;

    /// Encode `event` of `topic` as a single-line message.
    fn format(&self, topic: &str, event: &Value) -> Result<String, FormatError>;
}

/// Shared formatter trait object used by handlers.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn EventFormatter>,
}

impl SharedFormatter {
    pub fn new<F>(formatter: F) -> Self
    where
        F: EventFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    pub fn from_arc(inner: Arc<dyn EventFormatter>) -> Self {
        Self { inner }
    }

    pub fn can_format(&self, topic: &str) -> bool {
        self.inner.can_format(topic)
    }

    pub fn format(&self, topic: &str, event: &Value) -> Result<String, FormatError> {
        self.inner.format(topic, event)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn EventFormatter>)")
    }
}

/// Syslog PRI value: `facility * 8 + severity`, always within 0-191.
pub const fn priority_value(facility: Facility, severity: Severity) -> u8 {
    facility.code() * 8 + severity.code()
}

/// Formats audit events as CEF messages carried over syslog.
pub struct SyslogFormatter {
    structured_data: HashMap<String, StructuredDataFormatter>,
    severity: SeverityResolver,
    facility: Facility,
    host_name: String,
    product_name: String,
    proc_id: String,
    host_address: String,
    resolved_name: String,
}

impl SyslogFormatter {
    /// Build the encoder for every topic in `metadata`.
    ///
    /// Topics with malformed metadata are logged and skipped, which leaves
    /// them unformattable rather than failing construction. The local address
    /// is resolved here, once; a failed lookup renders `src=-` and falls back
    /// to the provider's host name for `targetType`.
    pub fn new(
        metadata: &dyn TopicMetadata,
        facility: Facility,
        severity_mappings: &[SeverityFieldMapping],
        providers: &Providers,
    ) -> Self {
        let host_name = providers
            .host_name
            .local_host_name()
            .unwrap_or_else(|| NIL_VALUE.to_owned());
        let product_name = providers
            .product_info
            .product_name()
            .map(|name| name.replace(' ', "-"))
            .unwrap_or_else(|| NIL_VALUE.to_owned());
        let structured_data = build_structured_data_formatters(&product_name, metadata);
        let (host_address, resolved_name) = match providers.address.resolve() {
            Ok(local) => (local.host_address, local.host_name),
            Err(err) => {
                debug!("Unable to resolve local host address: {err}");
                (NIL_VALUE.to_owned(), host_name.clone())
            }
        };
        Self {
            severity: SeverityResolver::new(severity_mappings, metadata),
            structured_data,
            facility,
            host_name,
            product_name,
            proc_id: std::process::id().to_string(),
            host_address,
            resolved_name,
        }
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn severity_resolver(&self) -> &SeverityResolver {
        &self.severity
    }

    pub fn structured_data_formatter(&self, topic: &str) -> Option<&StructuredDataFormatter> {
        self.structured_data.get(topic)
    }

    pub fn can_format(&self, topic: &str) -> bool {
        self.structured_data.contains_key(topic)
    }

    pub fn format(&self, topic: &str, event: &Value) -> Result<String, FormatError> {
        let sd_formatter = self
            .structured_data
            .get(topic)
            .ok_or_else(|| FormatError::UnknownTopic(topic.to_owned()))?;

        let severity = self.severity.resolve(topic, event);
        let priority = priority_value(self.facility, severity);
        let date = render_date();
        let event_name = top_level_str(event, event::EVENT_NAME).unwrap_or(NIL_VALUE);
        let structured_data = sd_formatter.format(event);

        let mut message = String::with_capacity(160 + structured_data.len());
        let _ = write!(
            message,
            "{date} {CEF_VERSION}|{VENDOR}|{}|{SCHEME_VERSION}|{priority}|{TYPE_LABEL}|{severity}|",
            self.product_name
        );
        let _ = write!(
            message,
            " src={} act={event_name} targetType={} procId={} msg={structured_data}",
            self.host_address, self.resolved_name, self.proc_id
        );
        Ok(message)
    }
}

impl EventFormatter for SyslogFormatter {
    fn can_format(&self, topic: &str) -> bool {
        SyslogFormatter::can_format(self, topic)
    }

    fn format(&self, topic: &str, event: &Value) -> Result<String, FormatError> {
        SyslogFormatter::format(self, topic, event)
    }
}

impl fmt::Debug for SyslogFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut topics: Vec<_> = self.structured_data.keys().collect();
        topics.sort();
        f.debug_struct("SyslogFormatter")
            .field("topics", &topics)
            .field("facility", &self.facility)
            .field("host_name", &self.host_name)
            .field("product_name", &self.product_name)
            .field("host_address", &self.host_address)
            .finish()
    }
}

fn build_structured_data_formatters(
    product_name: &str,
    metadata: &dyn TopicMetadata,
) -> HashMap<String, StructuredDataFormatter> {
    let mut formatters = HashMap::new();
    for topic in metadata.topics() {
        let Some(topic_metadata) = metadata.metadata(&topic) else {
            continue;
        };
        match StructuredDataFormatter::new(product_name, &topic, topic_metadata) {
            Ok(formatter) => {
                formatters.insert(topic, formatter);
            }
            Err(err) => warn!("Skipping syslog formatting for topic {topic}: {err}"),
        }
    }
    formatters
}

/// The time of formatting in local time. The event's own `timestamp` is not
/// used.
pub(crate) fn render_date() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}
