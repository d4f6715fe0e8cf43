//! Handler tests against loopback collectors.

mod test_utils;

use std::{
    io::BufReader,
    net::{TcpListener, UdpSocket},
    sync::mpsc,
    thread,
    time::Duration,
};

use cef_syslog_audit::{
    DeliveryMode, FormatError, HandlerError, OverflowPolicy, PublishError, StaticTopicMetadata,
    SyslogHandlerBuilder, SyslogHandlerConfig, TransportProtocol,
};
use logtest::Logger;
use rstest::{fixture, rstest};
use serde_json::Value;
use serial_test::serial;
use test_utils::{access_event, access_metadata, collector_providers, read_octet_frame};

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

fn spawn_collector(listener: TcpListener, frames: usize) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept connection");
        let mut reader = BufReader::new(stream);
        for _ in 0..frames {
            let frame = read_octet_frame(&mut reader).expect("read frame");
            tx.send(frame).expect("forward frame");
        }
    });
    rx
}

/// `logtest::Logger::start` installs a process-global logger and panics if
/// called twice, so install it once and hand out a drained handle per test.
fn start_logger() -> Logger {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        Logger::start();
    });
    let mut logger = Logger;
    while logger.pop().is_some() {}
    logger
}

fn expect_warning(logger: &mut Logger, needle: &str) {
    while let Some(record) = logger.pop() {
        if record.level() == log::Level::Warn && record.args().contains(needle) {
            return;
        }
    }
    panic!("expected a warning containing '{needle}'");
}

#[rstest]
#[case(false, DeliveryMode::Synchronous)]
#[case(true, DeliveryMode::Asynchronous)]
fn tcp_handler_delivers_encoded_events(
    tcp_listener: TcpListener,
    access_metadata: StaticTopicMetadata,
    access_event: Value,
    #[case] buffered: bool,
    #[case] mode: DeliveryMode,
) {
    let addr = tcp_listener.local_addr().expect("listener address");
    let frames = spawn_collector(tcp_listener, 1);
    let mut builder = SyslogHandlerBuilder::new()
        .with_tcp(addr.ip().to_string(), addr.port())
        .with_severity_mapping("access", "level")
        .with_providers(collector_providers());
    if buffered {
        builder = builder.with_buffering(16);
    }
    let mut handler = builder.build(&access_metadata).expect("build handler");
    assert_eq!(handler.delivery_mode(), mode);

    handler
        .publish_event("access", &access_event)
        .expect("publish event");
    let frame = frames
        .recv_timeout(Duration::from_secs(2))
        .expect("frame delivered");

    let expected = handler
        .formatter()
        .format("access", &access_event)
        .expect("encode event");
    // Only the date may differ between the two encodings.
    assert_eq!(
        frame.split_once(" CEF:").map(|(_, rest)| rest),
        expected.split_once(" CEF:").map(|(_, rest)| rest)
    );
    assert!(frame.contains("|1.0|14|forgerock cef|INFORMATIONAL|"), "{frame}");
    handler.close();
}

#[rstest]
fn udp_handler_from_config_sends_datagrams(
    access_metadata: StaticTopicMetadata,
    access_event: Value,
) {
    let collector = UdpSocket::bind(("127.0.0.1", 0)).expect("bind udp");
    collector
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set timeout");
    let addr = collector.local_addr().expect("udp address");
    let config: SyslogHandlerConfig = serde_json::from_value(serde_json::json!({
        "transportProtocol": "UDP",
        "host": addr.ip().to_string(),
        "port": addr.port(),
        "facility": "AUTH",
        "buffering": {"enabled": true, "maxSize": 8}
    }))
    .expect("valid config");
    assert_eq!(config.transport_protocol, TransportProtocol::Udp);

    let mut handler = SyslogHandlerBuilder::from_config(&config)
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("build handler");
    handler
        .publish_event("access", &access_event)
        .expect("publish event");

    let mut buf = vec![0u8; 4096];
    let (len, _) = collector.recv_from(&mut buf).expect("receive datagram");
    let datagram = String::from_utf8_lossy(&buf[..len]);
    assert!(datagram.contains("|38|forgerock cef|INFORMATIONAL|"), "{datagram}");
    assert!(datagram.ends_with("userId=\"bob\"]"), "{datagram}");
    handler.close();
}

#[rstest]
fn unknown_topic_never_reaches_publisher(access_metadata: StaticTopicMetadata, access_event: Value) {
    let collector = UdpSocket::bind(("127.0.0.1", 0)).expect("bind udp");
    collector
        .set_read_timeout(Some(Duration::from_millis(200)))
        .expect("set timeout");
    let addr = collector.local_addr().expect("udp address");
    let handler = SyslogHandlerBuilder::new()
        .with_udp(addr.ip().to_string(), addr.port())
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("build handler");

    assert!(!handler.can_format("activity"));
    let err = handler
        .publish_event("activity", &access_event)
        .expect_err("unknown topic");
    assert!(matches!(err, HandlerError::Format(FormatError::UnknownTopic(t)) if t == "activity"));
    let mut buf = [0u8; 64];
    assert!(collector.recv_from(&mut buf).is_err(), "nothing should be sent");
}

#[rstest]
#[serial]
fn publishing_after_close_warns_and_fails(
    access_metadata: StaticTopicMetadata,
    access_event: Value,
) {
    let mut logger = start_logger();
    let mut handler = SyslogHandlerBuilder::new()
        .with_udp("127.0.0.1", 514)
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("build handler");
    handler.close();
    assert!(handler.is_closed());
    assert!(!handler.flush());

    let err = handler
        .publish_event("access", &access_event)
        .expect_err("closed handler");
    assert!(matches!(err, HandlerError::Publish(PublishError::Closed)));
    expect_warning(&mut logger, "dropped 1 messages after close");
}

#[rstest]
#[serial]
fn builder_warns_about_invalid_severity_mappings(access_metadata: StaticTopicMetadata) {
    let mut logger = start_logger();
    let _handler = SyslogHandlerBuilder::new()
        .with_udp("127.0.0.1", 514)
        .with_severity_mapping("activity", "level")
        .with_severity_mapping("access", "nope")
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("invalid mappings are dropped, not fatal");
    expect_warning(&mut logger, "unknown topic activity");
    expect_warning(&mut logger, "references unknown field nope");
}

#[rstest]
fn refused_collector_surfaces_synchronous_error(
    access_metadata: StaticTopicMetadata,
    access_event: Value,
) {
    let addr = TcpListener::bind(("127.0.0.1", 0))
        .expect("bind")
        .local_addr()
        .expect("address");
    let handler = SyslogHandlerBuilder::new()
        .with_tcp(addr.ip().to_string(), addr.port())
        .with_connect_timeout_ms(250)
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("build handler");
    let err = handler
        .publish_event("access", &access_event)
        .expect_err("nobody is listening");
    assert!(matches!(err, HandlerError::Publish(PublishError::Delivery(_))));
}

#[rstest]
fn buffered_handler_accepts_events_while_collector_is_down(
    access_metadata: StaticTopicMetadata,
    access_event: Value,
) {
    let addr = TcpListener::bind(("127.0.0.1", 0))
        .expect("bind")
        .local_addr()
        .expect("address");
    let mut handler = SyslogHandlerBuilder::new()
        .with_tcp(addr.ip().to_string(), addr.port())
        .with_connect_timeout_ms(100)
        .with_buffering(4)
        .with_overflow_policy(OverflowPolicy::Block)
        .with_providers(collector_providers())
        .build(&access_metadata)
        .expect("build handler");
    for _ in 0..3 {
        handler
            .publish_event("access", &access_event)
            .expect("enqueue succeeds without a collector");
    }
    handler.close();
    assert!(handler.is_closed());
}
