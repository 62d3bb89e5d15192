//! Mock transport halves for deterministic testing.
//!
//! # Example
//!
//! ```
//! use naim_test_harness::{MockReader, MockWriter};
//!
//! // Inbound: the read side hands out these bytes, then reports end of stream.
//! let reader = MockReader::from_bytes(b"#AV2 \x69\x81\x87\xb2\x02\xff");
//!
//! // Outbound: the log handle stays with the test after the writer moves.
//! let (writer, log) = MockWriter::new();
//! assert!(log.bytes().is_empty());
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use naim_core::error::{Error, Result};
use naim_core::transport::{TransportReader, TransportWriter};
use tokio::time::Instant;

#[derive(Debug)]
enum ReadEvent {
    Data(Vec<u8>),
    Fail(io::ErrorKind),
}

/// A mock [`TransportReader`] fed from a queue of chunks.
///
/// Each queued chunk is returned by one `receive()` call (split over several
/// if the caller's buffer is smaller). Once the queue is empty the reader
/// reports end of stream.
#[derive(Debug)]
pub struct MockReader {
    events: VecDeque<ReadEvent>,
    connected: bool,
}

impl MockReader {
    /// Create an empty reader in the connected state.
    pub fn new() -> Self {
        MockReader {
            events: VecDeque::new(),
            connected: true,
        }
    }

    /// Create a reader that yields `data` as a single chunk.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut reader = Self::new();
        reader.push(data);
        reader
    }

    /// Queue a chunk of inbound bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.events.push_back(ReadEvent::Data(data.to_vec()));
    }

    /// Queue an I/O failure of the given kind.
    pub fn push_error(&mut self, kind: io::ErrorKind) {
        self.events.push_back(ReadEvent::Fail(kind));
    }

    /// Number of queued chunks and failures not yet consumed.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// When set to `false`, `receive()` returns [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportReader for MockReader {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        match self.events.pop_front() {
            None => Ok(0),
            Some(ReadEvent::Fail(kind)) => Err(Error::Io(io::Error::new(kind, "mock read failure"))),
            Some(ReadEvent::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.events.push_front(ReadEvent::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

/// One recorded `send()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentWrite {
    /// When the write happened, on the tokio clock.
    pub at: Instant,
    pub data: Vec<u8>,
}

/// Shared view of everything a [`MockWriter`] has accepted.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    writes: Arc<Mutex<Vec<SentWrite>>>,
}

impl SentLog {
    fn lock(&self) -> MutexGuard<'_, Vec<SentWrite>> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<SentWrite> {
        self.lock().clone()
    }

    /// Writes longer than one byte, i.e. everything except lone preambles.
    pub fn headers(&self) -> Vec<SentWrite> {
        self.lock().iter().filter(|w| w.data.len() > 1).cloned().collect()
    }

    /// All accepted bytes concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().iter().flat_map(|w| w.data.iter().copied()).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A mock [`TransportWriter`] that records every write with its timestamp.
#[derive(Debug)]
pub struct MockWriter {
    log: SentLog,
    fail_after: Option<usize>,
    connected: bool,
}

impl MockWriter {
    /// Create a writer and the log handle that observes it.
    pub fn new() -> (Self, SentLog) {
        let log = SentLog::default();
        let writer = MockWriter {
            log: log.clone(),
            fail_after: None,
            connected: true,
        };
        (writer, log)
    }

    /// Accept `n` more writes, then fail every later one with an I/O error.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// When set to `false`, `send()` returns [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

#[async_trait]
impl TransportWriter for MockWriter {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        match self.fail_after {
            Some(0) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "mock write failure",
                )));
            }
            Some(ref mut n) => *n -= 1,
            None => {}
        }

        self.log.lock().push(SentWrite {
            at: Instant::now(),
            data: data.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_yields_chunks_then_end_of_stream() {
        let mut reader = MockReader::new();
        reader.push(&[1, 2, 3]);
        reader.push(&[4]);

        let mut buf = [0u8; 16];
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 4);
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reader_splits_chunk_over_small_buffer() {
        let mut reader = MockReader::from_bytes(&[1, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];

        assert_eq!(reader.receive(&mut buf).await.unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(reader.remaining(), 0);
    }

    #[tokio::test]
    async fn reader_reports_queued_error() {
        let mut reader = MockReader::new();
        reader.push_error(io::ErrorKind::TimedOut);
        reader.push(&[9]);

        let mut buf = [0u8; 4];
        let err = reader.receive(&mut buf).await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut));
        assert_eq!(reader.receive(&mut buf).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reader_disconnected() {
        let mut reader = MockReader::from_bytes(&[1]);
        reader.set_connected(false);
        let mut buf = [0u8; 4];
        assert!(matches!(reader.receive(&mut buf).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn writer_records_into_shared_log() {
        let (mut writer, log) = MockWriter::new();
        writer.send(b"*").await.unwrap();
        writer.send(b"*AV2 \x24\xff").await.unwrap();

        assert_eq!(log.writes().len(), 2);
        assert_eq!(log.headers().len(), 1);
        assert_eq!(log.bytes(), b"**AV2 \x24\xff".to_vec());

        log.clear();
        assert!(log.bytes().is_empty());
    }

    #[tokio::test]
    async fn writer_fails_after_budget() {
        let (mut writer, log) = MockWriter::new();
        writer.fail_after(2);

        writer.send(&[1]).await.unwrap();
        writer.send(&[2]).await.unwrap();
        assert!(matches!(writer.send(&[3]).await, Err(Error::Io(_))));
        assert!(matches!(writer.send(&[4]).await, Err(Error::Io(_))));
        assert_eq!(log.bytes(), vec![1, 2]);
    }

    #[tokio::test]
    async fn writer_disconnected() {
        let (mut writer, log) = MockWriter::new();
        writer.set_connected(false);
        assert!(matches!(writer.send(&[1]).await, Err(Error::NotConnected)));
        assert!(log.writes().is_empty());
    }
}
