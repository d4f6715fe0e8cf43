//! Configuration structures consumed by the publishers.
//!
//! [`SyslogHandlerBuilder`](crate::builder::SyslogHandlerBuilder) validates
//! user input and produces a [`PublisherConfig`], which
//! [`select_publisher`](super::select_publisher) turns into a running
//! publisher.

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

use super::{
    framing::StreamFraming,
    transport::{Endpoint, TlsOptions, TransportProtocol},
};

/// Default bounded buffer capacity when buffering is enabled.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5000;
/// Default connection timeout applied when establishing stream connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default write timeout applied to socket writes; also bounds flush and close.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default maximum message size (in bytes) accepted by publishers.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20; // 1 MiB
/// Default base delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Default duration of healthy writes that resets backoff state.
pub const DEFAULT_BACKOFF_RESET: Duration = Duration::from_secs(30);
/// Default absolute deadline for reconnection suspension.
pub const DEFAULT_BACKOFF_DEADLINE: Duration = Duration::from_secs(120);

/// Determines how the asynchronous publisher reacts when its buffer is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the new message, preserving those already queued.
    #[default]
    Drop,
    /// Block the caller until space becomes available.
    Block,
    /// Block up to the specified duration before dropping the new message.
    Timeout(Duration),
}

/// Selects between synchronous and buffered delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferingConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: DEFAULT_BUFFER_CAPACITY,
            overflow_policy: OverflowPolicy::Drop,
        }
    }
}

impl BufferingConfig {
    /// Buffered delivery with the given capacity and the default drop policy.
    pub fn enabled(capacity: usize) -> Self {
        Self {
            enabled: true,
            capacity,
            ..Self::default()
        }
    }

    /// Unbuffered, synchronous delivery.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Whether an asynchronous publisher should be built.
    pub fn is_buffered(&self) -> bool {
        self.enabled && self.capacity > 0
    }
}

/// Exponential backoff policy for stream reconnection attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub reset_after: Duration,
    pub deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            reset_after: DEFAULT_BACKOFF_RESET,
            deadline: DEFAULT_BACKOFF_DEADLINE,
        }
    }
}

/// Everything needed to build a connection and wrap it in a publisher.
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    pub protocol: TransportProtocol,
    pub endpoint: Endpoint,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub max_message_size: usize,
    pub framing: StreamFraming,
    pub tls: Option<TlsOptions>,
    pub buffering: BufferingConfig,
    pub backoff: BackoffPolicy,
    pub warn_interval: Duration,
}

impl PublisherConfig {
    /// Configuration with defaults for everything but the four essentials.
    pub fn new(
        protocol: TransportProtocol,
        endpoint: Endpoint,
        buffering: BufferingConfig,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            protocol,
            endpoint,
            connect_timeout,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            framing: StreamFraming::default(),
            tls: None,
            buffering,
            backoff: BackoffPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}
