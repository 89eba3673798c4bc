//! Asynchronous JSONL tail reader with file rotation detection

use super::{forward, line_message, EventSource};
use crate::{channel::ChannelMessage, error::SourceError};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

pub struct TailSource {
    path: PathBuf,
    from_start: bool,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    /// Bytes consumed so far, used to spot in-place truncation
    position: u64,
    /// Partial line read before the producer wrote its newline
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl TailSource {
    pub fn new(path: PathBuf, from_start: bool) -> Self {
        Self {
            path,
            from_start,
            file: None,
            inode: None,
            position: 0,
            pending: Vec::new(),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Open the file; seeks to the end unless reading from the start
    pub async fn start(&mut self) -> std::io::Result<()> {
        self.open(!self.from_start).await
    }

    async fn open(&mut self, seek_to_end: bool) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;

        #[cfg(unix)]
        {
            self.inode = Some(metadata.ino());
        }
        #[cfg(not(unix))]
        let _ = metadata;

        let mut reader = BufReader::new(file);
        self.position = if seek_to_end {
            reader.seek(SeekFrom::End(0)).await?
        } else {
            0
        };
        self.file = Some(reader);

        if !self.pending.is_empty() {
            log::warn!(
                "Dropping {} bytes of unterminated line from {}",
                self.pending.len(),
                self.path.display()
            );
            self.pending.clear();
        }

        log::info!("📖 Started tailing: {}", self.path.display());
        Ok(())
    }

    /// Read the next complete, non-blank line (without its newline), waiting if necessary
    ///
    /// Bytes after the last newline stay pending until the producer finishes the line.
    pub async fn read_line(&mut self) -> std::io::Result<Vec<u8>> {
        loop {
            if self.detect_rotation().await? {
                log::info!("🔄 File rotation detected, reopening: {}", self.path.display());
                // A rotated file is new content: read it from the top
                self.open(false).await?;
            }

            let reader = self.file.as_mut().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "File not opened")
            })?;

            let read = reader.read_until(b'\n', &mut self.pending).await?;
            self.position += read as u64;

            if self.pending.last() != Some(&b'\n') {
                sleep(self.poll_interval).await;
                continue;
            }

            let mut line = std::mem::take(&mut self.pending);
            line.pop();
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Ok(line);
            }
        }
    }

    /// True when the file was replaced (new inode) or truncated below what was already read
    async fn detect_rotation(&self) -> std::io::Result<bool> {
        if self.file.is_none() {
            return Ok(false);
        }

        let metadata = tokio::fs::metadata(&self.path).await?;
        let truncated = metadata.len() < self.position;

        #[cfg(unix)]
        let replaced = self.inode.map_or(false, |old| old != metadata.ino());
        #[cfg(not(unix))]
        let replaced = false;

        Ok(truncated || replaced)
    }
}

#[async_trait]
impl EventSource for TailSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn run(self: Box<Self>, tx: mpsc::Sender<ChannelMessage>) -> Result<(), SourceError> {
        let mut tail = *self;
        tail.start().await?;

        loop {
            let line = tail.read_line().await?;
            let Some(message) = line_message(line) else {
                continue;
            };
            if forward(&tx, message).await.is_err() {
                log::warn!("Channel closed, stopping tail of {}", tail.path.display());
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_tail_reads_only_appended_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("detections.jsonl");

        let mut file = tokio::fs::File::create(&file_path).await.unwrap();
        file.write_all(b"old1\nold2\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let mut reader = TailSource::new(file_path.clone(), false);
        reader.start().await.unwrap();

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&file_path)
            .await
            .unwrap();
        file.write_all(b"\nnew1\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let line = tokio::time::timeout(Duration::from_secs(2), reader.read_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, b"new1");
    }

    #[tokio::test]
    async fn test_tail_from_start_forwards_existing_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("detections.jsonl");
        tokio::fs::write(&file_path, "first\nsecond\n").await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let source = Box::new(
            TailSource::new(file_path, true).with_poll_interval(Duration::from_millis(10)),
        );
        let handle = tokio::spawn(source.run(tx));

        for expected in ["first", "second"] {
            let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            match message {
                ChannelMessage::Raw(line) => assert_eq!(line, expected),
                other => panic!("unexpected message: {:?}", other),
            }
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_line_written_in_two_chunks_is_forwarded_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("detections.jsonl");
        tokio::fs::write(&file_path, "").await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let source = Box::new(
            TailSource::new(file_path.clone(), false).with_poll_interval(Duration::from_millis(10)),
        );
        let handle = tokio::spawn(source.run(tx));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&file_path)
            .await
            .unwrap();
        file.write_all(br#"{"timestamp":"t1","vehicles_"#).await.unwrap();
        file.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        file.write_all(b"detected\":2,\"class_counts\":{\"car\":2}}\n").await.unwrap();
        file.flush().await.unwrap();

        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match message {
            ChannelMessage::Raw(line) => assert_eq!(
                line,
                r#"{"timestamp":"t1","vehicles_detected":2,"class_counts":{"car":2}}"#
            ),
            other => panic!("unexpected message: {:?}", other),
        }

        // Nothing else arrives: the first chunk was never forwarded on its own
        let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(extra.is_err());

        handle.abort();
    }

    #[tokio::test]
    async fn test_truncated_file_is_reread_from_top() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("detections.jsonl");
        tokio::fs::write(&file_path, "first line\nsecond line\n").await.unwrap();

        let mut reader =
            TailSource::new(file_path.clone(), true).with_poll_interval(Duration::from_millis(10));
        reader.start().await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), b"first line");
        assert_eq!(reader.read_line().await.unwrap(), b"second line");

        // Rewritten in place, shorter than what was already consumed
        tokio::fs::write(&file_path, "fresh\n").await.unwrap();

        let line = tokio::time::timeout(Duration::from_secs(2), reader.read_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, b"fresh");
    }
}
