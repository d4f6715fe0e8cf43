//! Serde representation of the handler configuration.
//!
//! Hosts typically load this from JSON alongside the rest of their audit
//! configuration:
//!
//! ```json
//! {
//!   "transportProtocol": "TCP",
//!   "host": "syslog.example.com",
//!   "port": 6514,
//!   "connectTimeout": 30000,
//!   "facility": "LOCAL0",
//!   "severityFieldMappings": [{ "topic": "access", "field": "response/status" }],
//!   "buffering": { "enabled": true, "maxSize": 5000 }
//! }
//! ```
//!
//! [`SyslogHandlerBuilder::from_config`](crate::builder::SyslogHandlerBuilder::from_config)
//! validates the values and turns them into a running handler.

use serde::{Deserialize, Serialize};

use crate::{
    facility::Facility,
    formatter::SeverityFieldMapping,
    publisher::{DEFAULT_BUFFER_CAPACITY, DEFAULT_CONNECT_TIMEOUT, TransportProtocol},
};

/// Configuration for a syslog audit event handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyslogHandlerConfig {
    pub transport_protocol: TransportProtocol,
    pub host: String,
    pub port: u16,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout: u64,
    #[serde(default)]
    pub facility: Facility,
    #[serde(default)]
    pub severity_field_mappings: Vec<SeverityFieldMapping>,
    #[serde(default)]
    pub buffering: EventBufferingConfig,
}

/// Buffering section of [`SyslogHandlerConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventBufferingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for EventBufferingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_CONNECT_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

fn default_max_size() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl SyslogHandlerConfig {
    /// Configuration for `protocol://host:port` with every other field
    /// defaulted.
    pub fn new(transport_protocol: TransportProtocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            transport_protocol,
            host: host.into(),
            port,
            connect_timeout: default_connect_timeout_ms(),
            facility: Facility::default(),
            severity_field_mappings: Vec::new(),
            buffering: EventBufferingConfig::default(),
        }
    }
}
