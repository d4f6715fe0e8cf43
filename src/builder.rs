//! Builder for [`SyslogAuditHandler`].
//!
//! Collects transport, encoding, buffering, timeout, TLS and backoff settings,
//! validates them, and wires a [`SyslogFormatter`] to the publisher chosen by
//! [`select_publisher`].

use std::{io, time::Duration};

use thiserror::Error;

use crate::{
    config::SyslogHandlerConfig,
    facility::Facility,
    formatter::{SeverityFieldMapping, SharedFormatter, SyslogFormatter},
    handler::SyslogAuditHandler,
    providers::Providers,
    publisher::{
        BackoffPolicy, BufferingConfig, DEFAULT_BUFFER_CAPACITY, Endpoint, OverflowPolicy,
        PublisherConfig, StreamFraming, TlsOptions, TransportProtocol, select_publisher,
    },
    schema::TopicMetadata,
};

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst creating the handler.
    #[error(transparent)]
    Io(#[from] io::Error),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

#[derive(Clone, Debug)]
struct TransportConfig {
    protocol: TransportProtocol,
    host: String,
    port: u16,
}

#[derive(Clone, Debug, Default)]
struct TlsConfig {
    domain: Option<String>,
    insecure: bool,
}

/// Overrides for the reconnection backoff timings.
#[derive(Clone, Debug, Default)]
pub struct BackoffOverrides {
    base_ms: Option<u64>,
    cap_ms: Option<u64>,
    reset_after_ms: Option<u64>,
    deadline_ms: Option<u64>,
}

impl BackoffOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base delay in milliseconds.
    pub fn with_base_ms(mut self, base_ms: u64) -> Self {
        self.base_ms = Some(base_ms);
        self
    }

    /// Override the maximum delay in milliseconds.
    pub fn with_cap_ms(mut self, cap_ms: u64) -> Self {
        self.cap_ms = Some(cap_ms);
        self
    }

    /// Override the healthy period after which backoff resets, in milliseconds.
    pub fn with_reset_after_ms(mut self, reset_after_ms: u64) -> Self {
        self.reset_after_ms = Some(reset_after_ms);
        self
    }

    /// Override the suspension deadline in milliseconds.
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    fn apply(&self, policy: &mut BackoffPolicy) -> Result<(), HandlerBuildError> {
        if let Some(base) = self.base_ms {
            ensure_positive!(base, "backoff_base_ms")?;
            policy.base = Duration::from_millis(base);
        }
        if let Some(cap) = self.cap_ms {
            ensure_positive!(cap, "backoff_cap_ms")?;
            policy.cap = Duration::from_millis(cap);
        }
        if let Some(reset) = self.reset_after_ms {
            ensure_positive!(reset, "backoff_reset_after_ms")?;
            policy.reset_after = Duration::from_millis(reset);
        }
        if let Some(deadline) = self.deadline_ms {
            ensure_positive!(deadline, "backoff_deadline_ms")?;
            policy.deadline = Duration::from_millis(deadline);
        }
        Ok(())
    }
}

/// Builder for constructing [`SyslogAuditHandler`] instances.
#[derive(Clone, Debug, Default)]
pub struct SyslogHandlerBuilder {
    transport: Option<TransportConfig>,
    facility_code: Option<u8>,
    severity_mappings: Vec<SeverityFieldMapping>,
    buffered: bool,
    capacity: Option<usize>,
    overflow_policy: Option<OverflowPolicy>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    warn_interval_ms: Option<u64>,
    max_message_size: Option<usize>,
    framing: Option<StreamFraming>,
    tls: Option<TlsConfig>,
    backoff: BackoffOverrides,
    providers: Providers,
}

impl SyslogHandlerBuilder {
    /// Create a new builder with no transport configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from a deserialised configuration document.
    pub fn from_config(config: &SyslogHandlerConfig) -> Self {
        let builder = Self::new()
            .with_transport(config.transport_protocol, &config.host, config.port)
            .with_connect_timeout_ms(config.connect_timeout)
            .with_facility(config.facility)
            .with_severity_mappings(config.severity_field_mappings.iter().cloned());
        if config.buffering.enabled {
            builder.with_buffering(config.buffering.max_size)
        } else {
            builder
        }
    }

    pub fn with_transport(
        mut self,
        protocol: TransportProtocol,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        self.transport = Some(TransportConfig {
            protocol,
            host: host.into(),
            port,
        });
        self
    }

    pub fn with_tcp(self, host: impl Into<String>, port: u16) -> Self {
        self.with_transport(TransportProtocol::Tcp, host, port)
    }

    pub fn with_udp(self, host: impl Into<String>, port: u16) -> Self {
        self.with_transport(TransportProtocol::Udp, host, port)
    }

    /// Configure TLS using the provided domain and validation policy.
    ///
    /// The domain defaults to the transport host.
    pub fn with_tls(mut self, domain: Option<String>, insecure: bool) -> Self {
        self.tls = Some(TlsConfig { domain, insecure });
        self
    }

    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility_code = Some(facility.code());
        self
    }

    /// Select the facility by its numeric code (0-23).
    pub fn with_facility_code(mut self, code: u8) -> Self {
        self.facility_code = Some(code);
        self
    }

    pub fn with_severity_mapping(mut self, topic: impl Into<String>, field: impl Into<String>) -> Self {
        self.severity_mappings
            .push(SeverityFieldMapping::new(topic, field));
        self
    }

    pub fn with_severity_mappings(
        mut self,
        mappings: impl IntoIterator<Item = SeverityFieldMapping>,
    ) -> Self {
        self.severity_mappings.extend(mappings);
        self
    }

    /// Enable asynchronous delivery through a buffer of `capacity` messages.
    pub fn with_buffering(mut self, capacity: usize) -> Self {
        self.buffered = true;
        self.capacity = Some(capacity);
        self
    }

    option_setter!(
        #[doc = "Set the behaviour when the buffer is full."]
        with_overflow_policy,
        overflow_policy,
        OverflowPolicy
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(with_warn_interval_ms, warn_interval_ms, u64);
    option_setter!(with_max_message_size, max_message_size, usize);
    option_setter!(with_framing, framing, StreamFraming);

    /// Override backoff timings using the provided overrides.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    /// Replace the host name, product and address providers.
    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    fn validate(&self) -> Result<(), HandlerBuildError> {
        self.validate_transport()?;
        self.validate_facility()?;
        self.validate_capacity()?;
        self.validate_timeouts()?;
        self.validate_message_size()?;
        Ok(())
    }

    fn validate_transport(&self) -> Result<(), HandlerBuildError> {
        let Some(transport) = &self.transport else {
            return Err(HandlerBuildError::InvalidConfig(
                "syslog handler requires a transport".into(),
            ));
        };
        if transport.host.trim().is_empty() {
            return Err(HandlerBuildError::InvalidConfig(
                "transport host must not be empty".into(),
            ));
        }
        ensure_positive!(transport.port, "port")?;
        if self.tls.is_some() && !transport.protocol.is_stream() {
            return Err(HandlerBuildError::InvalidConfig(
                "tls is only supported for tcp transports".into(),
            ));
        }
        Ok(())
    }

    fn validate_facility(&self) -> Result<(), HandlerBuildError> {
        match self.facility_code {
            Some(code) if Facility::from_code(code).is_none() => {
                Err(HandlerBuildError::InvalidConfig(format!(
                    "facility code {code} must be between 0 and 23"
                )))
            }
            _ => Ok(()),
        }
    }

    fn validate_capacity(&self) -> Result<(), HandlerBuildError> {
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), HandlerBuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.write_timeout_ms {
            ensure_positive!(timeout, "write_timeout_ms")?;
        }
        if let Some(interval) = self.warn_interval_ms {
            ensure_positive!(interval, "warn_interval_ms")?;
        }
        Ok(())
    }

    fn validate_message_size(&self) -> Result<(), HandlerBuildError> {
        if let Some(size) = self.max_message_size {
            ensure_positive!(size, "max_message_size")?;
        }
        Ok(())
    }

    fn facility(&self) -> Facility {
        self.facility_code
            .and_then(Facility::from_code)
            .unwrap_or_default()
    }

    /// Validate the settings and produce the publisher configuration.
    pub fn build_publisher_config(&self) -> Result<PublisherConfig, HandlerBuildError> {
        self.validate()?;
        let Some(transport) = &self.transport else {
            return Err(HandlerBuildError::InvalidConfig(
                "syslog handler requires a transport".into(),
            ));
        };
        let buffering = if self.buffered {
            let mut buffering =
                BufferingConfig::enabled(self.capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY));
            if let Some(policy) = self.overflow_policy {
                buffering = buffering.with_overflow_policy(policy);
            }
            buffering
        } else {
            BufferingConfig::disabled()
        };
        let mut config = PublisherConfig::new(
            transport.protocol,
            Endpoint::new(transport.host.clone(), transport.port),
            buffering,
            crate::publisher::DEFAULT_CONNECT_TIMEOUT,
        );
        self.apply_optional_fields(&mut config);
        config.tls = self.build_tls_options(&transport.host);
        self.backoff.apply(&mut config.backoff)?;
        Ok(config)
    }

    fn apply_optional_fields(&self, config: &mut PublisherConfig) {
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(timeout);
        }
        if let Some(timeout) = self.write_timeout_ms {
            config.write_timeout = Duration::from_millis(timeout);
        }
        if let Some(interval) = self.warn_interval_ms {
            config.warn_interval = Duration::from_millis(interval);
        }
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        if let Some(framing) = self.framing {
            config.framing = framing;
        }
    }

    fn build_tls_options(&self, host: &str) -> Option<TlsOptions> {
        self.tls.as_ref().map(|tls_cfg| {
            let domain = tls_cfg
                .domain
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| host.to_owned());
            TlsOptions {
                domain,
                insecure_skip_verify: tls_cfg.insecure,
            }
        })
    }

    /// Build the formatter for the topics described by `metadata`.
    pub fn build_formatter(
        &self,
        metadata: &dyn TopicMetadata,
    ) -> Result<SyslogFormatter, HandlerBuildError> {
        self.validate_facility()?;
        Ok(SyslogFormatter::new(
            metadata,
            self.facility(),
            &self.severity_mappings,
            &self.providers,
        ))
    }

    /// Build the handler, opening no connection until the first publish.
    pub fn build(&self, metadata: &dyn TopicMetadata) -> Result<SyslogAuditHandler, HandlerBuildError> {
        let config = self.build_publisher_config()?;
        let formatter = SharedFormatter::new(self.build_formatter(metadata)?);
        let publisher = select_publisher(&config)?;
        Ok(SyslogAuditHandler::new(formatter, publisher))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        config::EventBufferingConfig,
        publisher::{DEFAULT_CONNECT_TIMEOUT, DeliveryMode},
        schema::StaticTopicMetadata,
    };

    fn assert_invalid(builder: SyslogHandlerBuilder, needle: &str) {
        let err = builder
            .build_publisher_config()
            .expect_err("configuration must be rejected");
        assert!(
            matches!(&err, HandlerBuildError::InvalidConfig(msg) if msg.contains(needle)),
            "unexpected error {err}"
        );
    }

    #[rstest]
    fn builder_requires_transport() {
        assert_invalid(SyslogHandlerBuilder::new(), "transport");
    }

    #[rstest]
    #[case(SyslogHandlerBuilder::new().with_tcp("  ", 514), "host")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 0), "port")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 514).with_buffering(0), "capacity")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 514).with_connect_timeout_ms(0), "connect_timeout_ms")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 514).with_write_timeout_ms(0), "write_timeout_ms")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 514).with_max_message_size(0), "max_message_size")]
    #[case(SyslogHandlerBuilder::new().with_udp("localhost", 514).with_tls(None, false), "tls")]
    #[case(SyslogHandlerBuilder::new().with_tcp("localhost", 514).with_facility_code(24), "facility")]
    #[case(
        SyslogHandlerBuilder::new()
            .with_tcp("localhost", 514)
            .with_backoff(BackoffOverrides::new().with_cap_ms(0)),
        "backoff_cap_ms"
    )]
    fn builder_rejects_invalid_settings(#[case] builder: SyslogHandlerBuilder, #[case] needle: &str) {
        assert_invalid(builder, needle);
    }

    #[rstest]
    fn builder_applies_overrides() {
        let config = SyslogHandlerBuilder::new()
            .with_tcp("collector", 6514)
            .with_buffering(10)
            .with_overflow_policy(OverflowPolicy::Block)
            .with_connect_timeout_ms(250)
            .with_write_timeout_ms(500)
            .with_max_message_size(2048)
            .with_framing(StreamFraming::NonTransparent)
            .with_tls(None, true)
            .with_backoff(BackoffOverrides::new().with_base_ms(5).with_deadline_ms(1000))
            .build_publisher_config()
            .expect("valid configuration");

        assert_eq!(config.protocol, TransportProtocol::Tcp);
        assert_eq!(config.endpoint, Endpoint::new("collector", 6514));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.write_timeout, Duration::from_millis(500));
        assert_eq!(config.max_message_size, 2048);
        assert_eq!(config.framing, StreamFraming::NonTransparent);
        assert_eq!(
            config.buffering,
            BufferingConfig::enabled(10).with_overflow_policy(OverflowPolicy::Block)
        );
        assert_eq!(
            config.tls,
            Some(TlsOptions {
                domain: "collector".into(),
                insecure_skip_verify: true,
            })
        );
        assert_eq!(config.backoff.base, Duration::from_millis(5));
        assert_eq!(config.backoff.deadline, Duration::from_millis(1000));
    }

    #[rstest]
    fn from_config_maps_every_field() {
        let config = SyslogHandlerConfig {
            connect_timeout: 1500,
            facility: Facility::Local0,
            severity_field_mappings: vec![SeverityFieldMapping::new("access", "level")],
            buffering: EventBufferingConfig {
                enabled: true,
                max_size: 42,
            },
            ..SyslogHandlerConfig::new(TransportProtocol::Udp, "collector", 514)
        };
        let builder = SyslogHandlerBuilder::from_config(&config);
        let publisher = builder
            .build_publisher_config()
            .expect("valid configuration");

        assert_eq!(publisher.protocol, TransportProtocol::Udp);
        assert_eq!(publisher.connect_timeout, Duration::from_millis(1500));
        assert_eq!(publisher.buffering, BufferingConfig::enabled(42));
        assert_eq!(builder.facility(), Facility::Local0);
        assert_eq!(
            builder.severity_mappings,
            vec![SeverityFieldMapping::new("access", "level")]
        );
    }

    #[rstest]
    fn unbuffered_config_defaults() {
        let config = SyslogHandlerBuilder::from_config(&SyslogHandlerConfig::new(
            TransportProtocol::Tcp,
            "collector",
            514,
        ))
        .build_publisher_config()
        .expect("valid configuration");
        assert!(!config.buffering.is_buffered());
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.tls.is_none());
    }

    #[rstest]
    fn build_selects_publisher_from_buffering() {
        let metadata = StaticTopicMetadata::new();
        let mut handler = SyslogHandlerBuilder::new()
            .with_udp("127.0.0.1", 514)
            .with_buffering(4)
            .build(&metadata)
            .expect("build handler");
        assert_eq!(handler.delivery_mode(), DeliveryMode::Asynchronous);
        handler.close();
        assert!(handler.is_closed());
    }
}
