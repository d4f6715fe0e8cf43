//! Message framing for stream transports (RFC 6587).

use serde::{Deserialize, Serialize};

/// How messages are delimited on a stream connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamFraming {
    /// `"<length> <message>"`, safe for messages containing newlines.
    #[default]
    OctetCounting,
    /// `"<message>\n"`, understood by older collectors.
    NonTransparent,
}

/// Frame `message` for transmission over a stream.
pub fn frame_message(message: &[u8], framing: StreamFraming) -> Vec<u8> {
    match framing {
        StreamFraming::OctetCounting => {
            let prefix = message.len().to_string();
            let mut framed = Vec::with_capacity(prefix.len() + 1 + message.len());
            framed.extend_from_slice(prefix.as_bytes());
            framed.push(b' ');
            framed.extend_from_slice(message);
            framed
        }
        StreamFraming::NonTransparent => {
            let mut framed = Vec::with_capacity(message.len() + 1);
            framed.extend_from_slice(message);
            framed.push(b'\n');
            framed
        }
    }
}
