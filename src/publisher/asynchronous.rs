//! Publisher that buffers messages for a background worker.

use std::{
    fmt, io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::Sender;
use log::warn;
use parking_lot::Mutex;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{
    DeliveryMode, PublishError, Publisher, check_size,
    config::OverflowPolicy,
    transport::Connection,
    worker::{PublisherCommand, WorkerConfig, enqueue_message, flush_queue, spawn_worker},
};

/// Queues messages in a bounded buffer and returns immediately.
///
/// The worker thread sends messages in the order they were accepted. When
/// the buffer is full the [`OverflowPolicy`] decides whether the caller
/// blocks, waits up to a timeout, or has its message dropped.
pub struct AsynchronousPublisher {
    tx: Option<Sender<PublisherCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    overflow_policy: OverflowPolicy,
    max_message_size: usize,
    warner: RateLimitedWarner,
    flush_timeout: Duration,
    abandon: Arc<AtomicBool>,
}

impl AsynchronousPublisher {
    /// Start the worker thread around `connection`.
    pub fn spawn(
        connection: Box<dyn Connection>,
        worker: WorkerConfig,
        overflow_policy: OverflowPolicy,
        max_message_size: usize,
        flush_timeout: Duration,
    ) -> io::Result<Self> {
        let warner = RateLimitedWarner::new(worker.warn_interval);
        let abandon = Arc::new(AtomicBool::new(false));
        let (tx, handle) = spawn_worker(connection, worker, Arc::clone(&abandon))?;
        Ok(Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            overflow_policy,
            max_message_size,
            warner,
            flush_timeout,
            abandon,
        })
    }

    /// Messages currently waiting in the buffer.
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, Sender::len)
    }

    /// Capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.tx.as_ref().and_then(Sender::capacity).unwrap_or(0)
    }

    fn request_shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let acknowledged = tx
            .send_timeout(PublisherCommand::Shutdown(ack_tx), self.flush_timeout)
            .is_ok()
            && ack_rx.recv_timeout(self.flush_timeout).is_ok();
        if !acknowledged {
            warn!(
                "AsynchronousPublisher: worker did not drain within {:?}; abandoning queued messages",
                self.flush_timeout
            );
            self.abandon.store(true, Ordering::Release);
        }
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("AsynchronousPublisher: worker thread panicked");
        }
    }
}

impl Publisher for AsynchronousPublisher {
    fn publish(&self, message: &str) -> Result<(), PublishError> {
        check_size(message, self.max_message_size)?;
        let Some(tx) = self.tx.as_ref() else {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!("AsynchronousPublisher dropped {count} messages after close");
            });
            return Err(PublishError::Closed);
        };
        enqueue_message(tx, message.to_owned(), self.overflow_policy, &self.warner)
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush(|count| {
            warn!("AsynchronousPublisher dropped {count} messages in the last interval");
        });
        flush_queue(tx, self.flush_timeout)
    }

    fn close(&mut self) {
        self.request_shutdown();
        self.join_worker();
        self.warner.flush(|count| {
            warn!("AsynchronousPublisher dropped {count} messages before close");
        });
    }

    fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Asynchronous
    }
}

impl Drop for AsynchronousPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for AsynchronousPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsynchronousPublisher")
            .field("overflow_policy", &self.overflow_policy)
            .field("max_message_size", &self.max_message_size)
            .field("flush_timeout", &self.flush_timeout)
            .field("queued", &self.queued())
            .finish()
    }
}
