//! Transport primitives for the publishers.
//!
//! A [`Connection`] sends one already-encoded message and reports failure.
//! Stream connections connect lazily, frame each message, and drop the socket
//! after any I/O error so the next send reconnects. Datagram connections send
//! one message per datagram.

use std::{
    fmt,
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    time::Duration,
};

#[cfg(feature = "tls")]
use native_tls::{TlsConnector, TlsStream};
use serde::{Deserialize, Serialize};

use super::framing::{StreamFraming, frame_message};

/// Transport protocol over which messages are published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportProtocol {
    /// Reliable byte stream (TCP), optionally wrapped in TLS.
    Tcp,
    /// Unreliable datagrams (UDP).
    Udp,
}

impl TransportProtocol {
    /// Whether the protocol keeps a connection that may need re-establishing.
    pub fn is_stream(self) -> bool {
        matches!(self, TransportProtocol::Tcp)
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
        })
    }
}

/// Remote collector address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP address.
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// TLS connection options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsOptions {
    /// Domain name presented during the TLS handshake.
    pub domain: String,
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

#[cfg(feature = "tls")]
impl TlsOptions {
    fn connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(io::Error::other)
    }
}

/// Byte sink bound to one remote collector.
///
/// A connection is owned by exactly one publisher, which serialises access
/// to it.
pub trait Connection: Send {
    fn protocol(&self) -> TransportProtocol;

    /// Send one encoded message.
    fn send(&mut self, message: &[u8]) -> io::Result<()>;

    /// Flush buffered bytes, if the transport buffers.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Release the underlying socket.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum ActiveStream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<TlsStream<TcpStream>>),
}

impl ActiveStream {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            ActiveStream::Plain(stream) => stream.write_all(buf),
            #[cfg(feature = "tls")]
            ActiveStream::Tls(stream) => stream.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ActiveStream::Plain(stream) => stream.flush(),
            #[cfg(feature = "tls")]
            ActiveStream::Tls(stream) => stream.flush(),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self {
            ActiveStream::Plain(stream) => stream.shutdown(std::net::Shutdown::Both),
            #[cfg(feature = "tls")]
            ActiveStream::Tls(stream) => stream.shutdown(),
        }
    }
}

/// Stream connection to a TCP collector.
pub struct TcpConnection {
    endpoint: Endpoint,
    connect_timeout: Duration,
    write_timeout: Duration,
    framing: StreamFraming,
    tls: Option<TlsOptions>,
    stream: Option<ActiveStream>,
}

impl TcpConnection {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            write_timeout: super::config::DEFAULT_WRITE_TIMEOUT,
            framing: StreamFraming::default(),
            tls: None,
            stream: None,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_framing(mut self, framing: StreamFraming) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_tls(mut self, tls: Option<TlsOptions>) -> Self {
        self.tls = tls;
        self
    }

    /// Whether a socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&self) -> io::Result<ActiveStream> {
        let stream = connect_tcp(&self.endpoint, self.connect_timeout)?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        match &self.tls {
            None => Ok(ActiveStream::Plain(stream)),
            Some(tls) => wrap_tls(stream, tls, self.connect_timeout),
        }
    }

    fn stream(&mut self) -> io::Result<&mut ActiveStream> {
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no active stream"))
    }
}

impl Connection for TcpConnection {
    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::Tcp
    }

    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        let framed = frame_message(message, self.framing);
        let result = self
            .stream()
            .and_then(|stream| stream.write_all(&framed).and_then(|()| stream.flush()));
        if result.is_err() {
            self.stream = None;
        }
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut().map(ActiveStream::flush) {
            Some(Err(err)) => {
                self.stream = None;
                Err(err)
            }
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.flush().and_then(|()| stream.shutdown()),
            None => Ok(()),
        }
    }
}

fn connect_tcp(endpoint: &Endpoint, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in endpoint.socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {endpoint}"),
        )
    }))
}

#[cfg(feature = "tls")]
fn wrap_tls(stream: TcpStream, tls: &TlsOptions, timeout: Duration) -> io::Result<ActiveStream> {
    let connector = tls.connector()?;
    let write_timeout = stream.write_timeout()?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    let stream = connector
        .connect(&tls.domain, stream)
        .map_err(io::Error::other)?;
    let tcp_ref = stream.get_ref();
    tcp_ref.set_read_timeout(None)?;
    tcp_ref.set_write_timeout(write_timeout)?;
    Ok(ActiveStream::Tls(Box::new(stream)))
}

#[cfg(not(feature = "tls"))]
fn wrap_tls(_stream: TcpStream, _tls: &TlsOptions, _timeout: Duration) -> io::Result<ActiveStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "tls support is not compiled in",
    ))
}

/// Datagram connection to a UDP collector.
pub struct UdpConnection {
    endpoint: Endpoint,
    socket: Option<(UdpSocket, SocketAddr)>,
}

impl UdpConnection {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            socket: None,
        }
    }

    fn bind(&self) -> io::Result<(UdpSocket, SocketAddr)> {
        let target = self.endpoint.socket_addrs()?.into_iter().next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", self.endpoint),
            )
        })?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        Ok((UdpSocket::bind(local)?, target))
    }
}

impl Connection for UdpConnection {
    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::Udp
    }

    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        if self.socket.is_none() {
            self.socket = Some(self.bind()?);
        }
        let Some((socket, target)) = self.socket.as_ref() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no socket bound"));
        };
        let sent = socket.send_to(message, target)?;
        if sent < message.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("datagram truncated: sent {sent} of {} bytes", message.len()),
            ));
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.socket = None;
        Ok(())
    }
}
