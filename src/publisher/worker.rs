//! Worker thread driving asynchronous delivery.
//!
//! The worker exclusively owns the [`Connection`]. Producers only touch the
//! bounded channel, and the single consumer sends in dequeue order, so
//! messages leave in the order they were enqueued.

use std::{
    io,
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};
use log::{debug, warn};

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    PublishError,
    backoff::BackoffState,
    config::{BackoffPolicy, OverflowPolicy},
    transport::Connection,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum PublisherCommand {
    Message(String),
    /// Acknowledged with the connection's flush outcome.
    Flush(Sender<bool>),
    /// Acknowledged once the queue ahead of it is drained and the connection
    /// closed.
    Shutdown(Sender<()>),
}

/// Configuration for the background worker thread.
pub struct WorkerConfig {
    pub capacity: usize,
    pub backoff: BackoffPolicy,
    pub warn_interval: Duration,
    /// Held before the first dequeue; lets tests fill the buffer.
    pub start_barrier: Option<Arc<Barrier>>,
}

/// Spawn the worker, returning the producer side of its buffer.
///
/// Setting `abandon` makes the worker drop every remaining message without
/// sending it.
pub fn spawn_worker(
    connection: Box<dyn Connection>,
    config: WorkerConfig,
    abandon: Arc<AtomicBool>,
) -> io::Result<(Sender<PublisherCommand>, thread::JoinHandle<()>)> {
    let WorkerConfig {
        capacity,
        backoff,
        warn_interval,
        start_barrier,
    } = config;
    let (tx, rx) = bounded(capacity);
    let handle = thread::Builder::new()
        .name("syslog-publisher".into())
        .spawn(move || {
            if let Some(barrier) = start_barrier {
                barrier.wait();
            }
            Worker {
                connection,
                backoff: BackoffState::new(backoff),
                suspended_until: None,
                warner: RateLimitedWarner::new(warn_interval),
                abandon,
            }
            .run(rx);
        })?;
    Ok((tx, handle))
}

struct Worker {
    connection: Box<dyn Connection>,
    backoff: BackoffState,
    suspended_until: Option<Instant>,
    warner: RateLimitedWarner,
    abandon: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self, rx: Receiver<PublisherCommand>) {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                PublisherCommand::Message(message) => self.deliver(&message),
                PublisherCommand::Flush(ack) => {
                    let flushed = self.connection.flush().is_ok();
                    self.report_drops();
                    let _ = ack.send(flushed);
                }
                PublisherCommand::Shutdown(ack) => {
                    self.shutdown();
                    let _ = ack.send(());
                    return;
                }
            }
        }
        self.shutdown();
    }

    fn deliver(&mut self, message: &str) {
        if self.abandon.load(Ordering::Acquire) {
            self.warner.record_drop();
            return;
        }

        let now = Instant::now();
        if let Some(until) = self.suspended_until {
            if now < until {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    warn!("SyslogPublisher dropped {count} messages; no active connection");
                });
                return;
            }
            self.suspended_until = None;
        }

        self.backoff.reset_after_idle(now);
        match self.connection.send(message.as_bytes()) {
            Ok(()) => self.backoff.record_success(now),
            Err(err) => {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    warn!("SyslogPublisher send failed: {err}; dropped {count} messages");
                });
                if self.connection.protocol().is_stream() {
                    if !self.backoff.is_failing() {
                        debug!("SyslogPublisher entering backoff after send failure");
                    }
                    self.suspended_until = self.backoff.next_delay(now).map(|delay| now + delay);
                }
            }
        }
    }

    fn report_drops(&self) {
        self.warner.flush(|count| {
            warn!("SyslogPublisher dropped {count} messages in the last interval");
        });
    }

    fn shutdown(&mut self) {
        if let Err(err) = self.connection.close() {
            warn!("SyslogPublisher failed to close connection: {err}");
        }
        self.report_drops();
    }
}

/// Queue `message` according to `policy`.
pub fn enqueue_message(
    tx: &Sender<PublisherCommand>,
    message: String,
    policy: OverflowPolicy,
    warner: &RateLimitedWarner,
) -> Result<(), PublishError> {
    let result = match policy {
        OverflowPolicy::Drop => match tx.try_send(PublisherCommand::Message(message)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PublishError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(PublishError::Closed),
        },
        OverflowPolicy::Block => tx
            .send(PublisherCommand::Message(message))
            .map_err(|_| PublishError::Closed),
        OverflowPolicy::Timeout(dur) => {
            match tx.send_timeout(PublisherCommand::Message(message), dur) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => Err(PublishError::Timeout(dur)),
                Err(SendTimeoutError::Disconnected(_)) => Err(PublishError::Closed),
            }
        }
    };
    if let Err(err) = &result {
        warner.record_drop();
        warner.warn_if_due(|count| {
            warn!("SyslogPublisher {err}; dropped {count} messages");
        });
    }
    result
}

/// Ask the worker to flush, waiting up to `timeout` at each step.
pub fn flush_queue(tx: &Sender<PublisherCommand>, timeout: Duration) -> bool {
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(PublisherCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    ack_rx.recv_timeout(timeout).unwrap_or(false)
}
