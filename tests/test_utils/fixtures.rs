//! Shared fixtures for the integration tests: topic metadata for an `access`
//! topic, deterministic host providers, and a reader for octet-counted
//! frames received by loopback collectors.

#![allow(dead_code)]

use std::{
    io::{BufRead, Read},
    sync::Arc,
};

use cef_syslog_audit::{
    Facility, Providers, SeverityFieldMapping, StaticTopicMetadata, SyslogFormatter,
    providers::{StaticAddressResolver, StaticHostName},
};
use rstest::fixture;
use serde_json::{Value, json};

pub const PRODUCT: &str = "Trust Partner Network";
pub const HOST_NAME: &str = "audit-host.local";
pub const HOST_ADDRESS: &str = "10.1.2.3";

/// Metadata declaring `access` (with nested `response/status`) and `config`.
#[fixture]
pub fn access_metadata() -> StaticTopicMetadata {
    StaticTopicMetadata::new()
        .with_topic(
            "access",
            json!({"schema": {"properties": {
                "_id": {"type": "string"},
                "timestamp": {"type": "string"},
                "eventName": {"type": "string"},
                "userId": {"type": "string"},
                "level": {"type": "string"},
                "response": {"type": "object", "properties": {
                    "status": {"type": "string"}
                }}
            }}}),
        )
        .with_topic(
            "config",
            json!({"schema": {"properties": {
                "_id": {"type": "string"},
                "objectId": {"type": "string"}
            }}}),
        )
}

/// Providers returning fixed host and product identities.
#[fixture]
pub fn collector_providers() -> Providers {
    Providers::default()
        .with_product_name(PRODUCT)
        .with_host_name(Arc::new(StaticHostName(Some(HOST_NAME.into()))))
        .with_address_resolver(Arc::new(StaticAddressResolver::new(HOST_ADDRESS, HOST_NAME)))
}

/// Formatter for the `access` topic on the `AUTH` facility with `level`
/// driving the severity.
#[fixture]
pub fn formatter(
    access_metadata: StaticTopicMetadata,
    collector_providers: Providers,
) -> SyslogFormatter {
    SyslogFormatter::new(
        &access_metadata,
        Facility::Auth,
        &[SeverityFieldMapping::new("access", "level")],
        &collector_providers,
    )
}

/// A login event on the `access` topic.
#[fixture]
pub fn access_event() -> Value {
    json!({
        "_id": "0419d364-1b3d-4e4f-b769-555c3ca098b0",
        "timestamp": "2024-01-05T14:03:22.000Z",
        "eventName": "LOGIN",
        "userId": "bob",
        "response": {"status": "SUCCESSFUL"}
    })
}

/// Read one `"<len> <msg>"` frame.
pub fn read_octet_frame(reader: &mut impl BufRead) -> std::io::Result<String> {
    let mut len = Vec::new();
    reader.read_until(b' ', &mut len)?;
    len.pop();
    let len: usize = String::from_utf8_lossy(&len)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    String::from_utf8(body).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
