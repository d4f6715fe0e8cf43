//! Audit event handler combining a formatter and a publisher.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::{
    formatter::{FormatError, SharedFormatter},
    publisher::{DeliveryMode, PublishError, Publisher},
};

/// Errors returned by [`SyslogAuditHandler::publish_event`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Encodes audit events and hands them to a [`Publisher`].
///
/// The handler is shared by every producer thread. Closing it closes the
/// publisher; it is also closed on drop.
pub struct SyslogAuditHandler {
    formatter: SharedFormatter,
    publisher: Box<dyn Publisher>,
}

impl SyslogAuditHandler {
    pub fn new(formatter: SharedFormatter, publisher: Box<dyn Publisher>) -> Self {
        Self {
            formatter,
            publisher,
        }
    }

    /// Encode `event` for `topic` and publish it.
    ///
    /// Events for unknown topics are rejected before reaching the publisher.
    pub fn publish_event(&self, topic: &str, event: &Value) -> Result<(), HandlerError> {
        let message = self.formatter.format(topic, event)?;
        self.publisher.publish(&message)?;
        Ok(())
    }

    pub fn can_format(&self, topic: &str) -> bool {
        self.formatter.can_format(topic)
    }

    /// See [`Publisher::flush`].
    pub fn flush(&self) -> bool {
        self.publisher.flush()
    }

    pub fn close(&mut self) {
        self.publisher.close();
    }

    pub fn is_closed(&self) -> bool {
        self.publisher.is_closed()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.publisher.mode()
    }

    pub fn formatter(&self) -> &SharedFormatter {
        &self.formatter
    }
}

impl Drop for SyslogAuditHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SyslogAuditHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyslogAuditHandler")
            .field("formatter", &self.formatter)
            .field("mode", &self.publisher.mode())
            .field("closed", &self.publisher.is_closed())
            .finish()
    }
}
