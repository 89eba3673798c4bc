//! Event sources feeding the channel pump
//!
//! Each source runs as its own task and pushes `ChannelMessage`s into the
//! shared mpsc queue. Any connection lifecycle (files, pipes, detectors)
//! belongs here, never in the aggregation core.

pub mod simulator;
pub mod stdin;
pub mod tail;

use crate::{channel::ChannelMessage, error::SourceError};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use simulator::{Simulator, SimulatorConfig, VEHICLE_CLASSES};
pub use stdin::StdinSource;
pub use tail::TailSource;

#[async_trait]
pub trait EventSource: Send {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Produce messages until the source is exhausted or the receiver goes away
    async fn run(self: Box<Self>, tx: mpsc::Sender<ChannelMessage>) -> Result<(), SourceError>;
}

/// Forward one message, mapping a closed queue to `SourceError::ChannelClosed`
pub(crate) async fn forward(
    tx: &mpsc::Sender<ChannelMessage>,
    message: ChannelMessage,
) -> Result<(), SourceError> {
    tx.send(message).await.map_err(|_| SourceError::ChannelClosed)
}

/// Turn one raw input line into a message; `None` for blank lines
///
/// Lines that are not UTF-8 still travel to the pump so the rejection is
/// counted there like any other malformed input.
pub(crate) fn line_message(line: Vec<u8>) -> Option<ChannelMessage> {
    match String::from_utf8(line) {
        Ok(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| ChannelMessage::Raw(trimmed.to_string()))
        }
        Err(e) => Some(ChannelMessage::Undecodable(e.into_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_message() {
        assert!(line_message(b"  \r\n".to_vec()).is_none());
        assert!(matches!(
            line_message(b" {\"a\":1}\r\n".to_vec()),
            Some(ChannelMessage::Raw(line)) if line == r#"{"a":1}"#
        ));
        assert!(matches!(
            line_message(vec![0xff, b'\n']),
            Some(ChannelMessage::Undecodable(bytes)) if bytes == vec![0xff, b'\n']
        ));
    }
}
