//! Delivery of encoded messages to a remote syslog collector.
//!
//! A [`Publisher`] accepts already-formatted messages and hands them to a
//! [`Connection`]. [`SynchronousPublisher`] sends on the caller's thread.
//! [`AsynchronousPublisher`] queues messages in a bounded buffer drained by a
//! dedicated worker thread, which owns the connection, reconnects lazily, and
//! suspends delivery with jittered backoff while a stream collector is
//! unreachable. [`select_publisher`] picks the variant from a
//! [`PublisherConfig`].

pub(crate) mod backoff;
mod asynchronous;
mod config;
mod framing;
mod selector;
mod synchronous;
mod transport;
mod worker;


use std::{io, time::Duration};

use thiserror::Error;

pub use asynchronous::AsynchronousPublisher;
pub use config::{
    BackoffPolicy, BufferingConfig, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP,
    DEFAULT_BACKOFF_DEADLINE, DEFAULT_BACKOFF_RESET, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_WRITE_TIMEOUT, OverflowPolicy,
    PublisherConfig,
};
pub use framing::{StreamFraming, frame_message};
pub use selector::{connection_for, publisher_for, select_publisher};
pub use synchronous::SynchronousPublisher;
pub use worker::WorkerConfig;
pub use transport::{
    Connection, Endpoint, TcpConnection, TlsOptions, TransportProtocol, UdpConnection,
};

/// Errors returned when a message cannot be accepted or delivered.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publisher has been closed.
    #[error("publisher is closed")]
    Closed,
    /// The buffer is full and the message was dropped.
    #[error("buffer full")]
    QueueFull,
    /// Waiting for buffer space exceeded the configured timeout.
    #[error("timed out after {0:?} waiting for buffer space")]
    Timeout(Duration),
    /// The message exceeds the configured maximum size.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },
    /// The transport reported an error while sending.
    #[error("delivery failed: {0}")]
    Delivery(#[from] io::Error),
}

/// How a publisher hands messages to its connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Sent on the caller's thread before `publish` returns.
    Synchronous,
    /// Queued and sent later by a worker thread.
    Asynchronous,
}

/// Sink for encoded syslog messages.
///
/// Implementations are shared across producer threads and must serialise
/// access to their connection.
pub trait Publisher: Send + Sync {
    /// Deliver or enqueue one encoded message.
    fn publish(&self, message: &str) -> Result<(), PublishError>;

    /// Flush pending output. Returns `false` when closed or on timeout.
    fn flush(&self) -> bool;

    /// Release the connection. Further publishes fail with
    /// [`PublishError::Closed`]. Calling it again is a no-op.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn mode(&self) -> DeliveryMode;
}

fn check_size(message: &str, max: usize) -> Result<(), PublishError> {
    let size = message.len();
    if size > max {
        return Err(PublishError::MessageTooLarge { size, max });
    }
    Ok(())
}
