//! Chooses the connection and publisher variant for a configuration.

use std::io;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    AsynchronousPublisher, Publisher, SynchronousPublisher,
    config::PublisherConfig,
    transport::{Connection, TcpConnection, TransportProtocol, UdpConnection},
    worker::WorkerConfig,
};

/// Build the unopened connection for `config.protocol`.
///
/// TCP connections honour the connect timeout, framing, and TLS options;
/// UDP ignores them.
pub fn connection_for(config: &PublisherConfig) -> Box<dyn Connection> {
    match config.protocol {
        TransportProtocol::Tcp => Box::new(
            TcpConnection::new(config.endpoint.clone(), config.connect_timeout)
                .with_write_timeout(config.write_timeout)
                .with_framing(config.framing)
                .with_tls(config.tls.clone()),
        ),
        TransportProtocol::Udp => Box::new(UdpConnection::new(config.endpoint.clone())),
    }
}

/// Wrap `connection` in the publisher selected by `config.buffering`.
pub fn publisher_for(
    connection: Box<dyn Connection>,
    config: &PublisherConfig,
) -> io::Result<Box<dyn Publisher>> {
    if config.buffering.is_buffered() {
        let worker = WorkerConfig {
            capacity: config.buffering.capacity,
            backoff: config.backoff.clone(),
            warn_interval: config.warn_interval,
            start_barrier: None,
        };
        let publisher = AsynchronousPublisher::spawn(
            connection,
            worker,
            config.buffering.overflow_policy,
            config.max_message_size,
            config.write_timeout,
        )?;
        Ok(Box::new(publisher))
    } else {
        Ok(Box::new(SynchronousPublisher::new(
            connection,
            config.max_message_size,
            RateLimitedWarner::new(config.warn_interval),
        )))
    }
}

/// Build the connection and publisher described by `config`.
pub fn select_publisher(config: &PublisherConfig) -> io::Result<Box<dyn Publisher>> {
    publisher_for(connection_for(config), config)
}
