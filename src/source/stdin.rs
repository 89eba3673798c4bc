use super::{forward, line_message, EventSource};
use crate::{channel::ChannelMessage, error::SourceError};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Line-delimited JSON from standard input (or any buffered reader in tests)
///
/// Sends `Shutdown` once the input reaches EOF.
pub struct StdinSource<R = BufReader<tokio::io::Stdin>> {
    reader: R,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AsyncBufRead + Unpin + Send + 'static> StdinSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> EventSource for StdinSource<R> {
    fn name(&self) -> &'static str {
        "stdin"
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<ChannelMessage>) -> Result<(), SourceError> {
        let mut reader = self.reader;
        let mut forwarded = 0u64;

        loop {
            // Raw bytes: one undecodable line must not end the stream
            let mut line = Vec::new();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            if let Some(message) = line_message(line) {
                forward(&tx, message).await?;
                forwarded += 1;
            }
        }

        log::info!("stdin closed after {} lines", forwarded);
        forward(&tx, ChannelMessage::Shutdown).await
    }
}
