//! Audit event publishing over syslog.
//!
//! Audit events are encoded as a CEF header wrapping RFC 5424 structured data
//! and sent to a remote collector over TCP (optionally TLS) or UDP, either
//! synchronously or through a bounded buffer drained by a worker thread.
//!
//! ```no_run
//! use cef_syslog_audit::{StaticTopicMetadata, SyslogHandlerBuilder, Facility};
//! use serde_json::json;
//!
//! let metadata = StaticTopicMetadata::new().with_topic(
//!     "access",
//!     json!({"schema": {"properties": {"userId": {"type": "string"}}}}),
//! );
//! let handler = SyslogHandlerBuilder::new()
//!     .with_tcp("syslog.example.com", 6514)
//!     .with_facility(Facility::Auth)
//!     .with_buffering(5000)
//!     .build(&metadata)?;
//! handler.publish_event(
//!     "access",
//!     &json!({"_id": "1", "timestamp": "2024-01-05T14:03:22Z", "eventName": "LOGIN", "userId": "bob"}),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod config;
pub mod event;
pub mod facility;
pub mod formatter;
pub mod handler;
pub mod providers;
pub mod publisher;
pub mod rate_limited_warner;
pub mod schema;
pub mod severity;

pub use builder::{BackoffOverrides, HandlerBuildError, SyslogHandlerBuilder};
pub use config::{EventBufferingConfig, SyslogHandlerConfig};
pub use facility::Facility;
pub use formatter::{
    EventFormatter, FormatError, SeverityFieldMapping, SharedFormatter, SyslogFormatter,
    priority_value,
};
pub use handler::{HandlerError, SyslogAuditHandler};
pub use providers::{
    LocalAddress, LocalAddressResolver, LocalHostNameProvider, ProductInfoProvider, Providers,
};
pub use publisher::{
    AsynchronousPublisher, BufferingConfig, DeliveryMode, Endpoint, OverflowPolicy, PublishError,
    Publisher, PublisherConfig, StreamFraming, SynchronousPublisher, TransportProtocol,
    select_publisher,
};
pub use rate_limited_warner::RateLimitedWarner;
pub use schema::{SchemaError, StaticTopicMetadata, TopicMetadata};
pub use severity::Severity;
