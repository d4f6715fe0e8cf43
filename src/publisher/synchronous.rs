//! Publisher that sends on the caller's thread.

use std::fmt;

use log::warn;
use parking_lot::Mutex;

use crate::rate_limited_warner::RateLimitedWarner;

use super::{DeliveryMode, PublishError, Publisher, check_size, transport::Connection};

/// Sends each message before `publish` returns.
///
/// Concurrent callers are serialised by a mutex around the connection, so a
/// slow collector blocks every producer.
pub struct SynchronousPublisher {
    connection: Mutex<Option<Box<dyn Connection>>>,
    max_message_size: usize,
    warner: RateLimitedWarner,
}

impl SynchronousPublisher {
    pub fn new(
        connection: Box<dyn Connection>,
        max_message_size: usize,
        warner: RateLimitedWarner,
    ) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
            max_message_size,
            warner,
        }
    }
}

impl Publisher for SynchronousPublisher {
    fn publish(&self, message: &str) -> Result<(), PublishError> {
        check_size(message, self.max_message_size)?;
        let mut guard = self.connection.lock();
        let Some(connection) = guard.as_mut() else {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!("SynchronousPublisher dropped {count} messages after close");
            });
            return Err(PublishError::Closed);
        };
        connection.send(message.as_bytes()).map_err(|err| {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!(
                    "SynchronousPublisher failed to send to {} collector: {err}; dropped {count} messages",
                    connection.protocol()
                );
            });
            PublishError::Delivery(err)
        })
    }

    fn flush(&self) -> bool {
        let mut guard = self.connection.lock();
        let Some(connection) = guard.as_mut() else {
            return false;
        };
        self.warner.flush(|count| {
            warn!("SynchronousPublisher dropped {count} messages in the last interval");
        });
        connection.flush().is_ok()
    }

    fn close(&mut self) {
        let Some(mut connection) = self.connection.lock().take() else {
            return;
        };
        if let Err(err) = connection.close() {
            warn!("SynchronousPublisher failed to close connection: {err}");
        }
        self.warner.flush(|count| {
            warn!("SynchronousPublisher dropped {count} messages before close");
        });
    }

    fn is_closed(&self) -> bool {
        self.connection.lock().is_none()
    }

    fn mode(&self) -> DeliveryMode {
        DeliveryMode::Synchronous
    }
}

impl Drop for SynchronousPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SynchronousPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronousPublisher")
            .field("max_message_size", &self.max_message_size)
            .field("closed", &self.is_closed())
            .finish()
    }
}
