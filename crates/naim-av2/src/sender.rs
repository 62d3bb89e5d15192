//! Timed command transmission.
//!
//! The amplifier only accepts commands that respect its timing contract:
//!
//! - At least [`min_gap`](SendTiming::min_gap) (100 ms) between the start of
//!   one command and the preamble of the next.
//! - A command that does not follow another within the
//!   [`warm_window`](SendTiming::warm_window) (200 ms) is *cold*: its preamble
//!   byte must be followed by a [`preamble_pause`](SendTiming::preamble_pause)
//!   (25 ms) before the header.
//! - A *warm* command, one inside the window, must send its header straight
//!   after the preamble.
//!
//! [`TimedSender`] owns the transport writer and the instant of the last
//! send, and applies these rules to every frame. Callers that share a sender
//! must hold it for the whole of [`TimedSender::send`] so two frames never
//! interleave on the line.

use std::time::Duration;

use naim_core::error::Result;
use naim_core::transport::TransportWriter;
use tokio::time::Instant;

use crate::protocol::{COMMAND_PREAMBLE, encode_command_frame};

/// The device's inter-command timing contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTiming {
    /// Minimum time from one command's header to the next command's preamble.
    pub min_gap: Duration,
    /// Commands following the previous one within this window are warm.
    pub warm_window: Duration,
    /// Headroom subtracted from the warm window to cover the time the
    /// preamble and header writes themselves take.
    pub transmit_allowance: Duration,
    /// Pause between preamble and header for a cold command.
    pub preamble_pause: Duration,
}

impl Default for SendTiming {
    fn default() -> Self {
        Self {
            min_gap: Duration::from_millis(100),
            warm_window: Duration::from_millis(200),
            transmit_allowance: Duration::from_millis(5),
            preamble_pause: Duration::from_millis(25),
        }
    }
}

impl SendTiming {
    /// How long to wait before the preamble, given the time since the last send.
    pub fn wait_before_preamble(&self, since_last: Option<Duration>) -> Duration {
        match since_last {
            Some(elapsed) => self.min_gap.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    /// Whether a command sent now is cold and needs the post-preamble pause.
    pub fn is_cold(&self, since_last: Option<Duration>) -> bool {
        match since_last {
            Some(elapsed) => elapsed > self.warm_window.saturating_sub(self.transmit_allowance),
            None => true,
        }
    }
}

/// Owns the transport writer and enforces [`SendTiming`] on every frame.
pub struct TimedSender<W> {
    writer: W,
    timing: SendTiming,
    last_send: Option<Instant>,
}

impl<W: TransportWriter> TimedSender<W> {
    /// Create a sender that has not sent anything yet.
    pub fn new(writer: W, timing: SendTiming) -> Self {
        Self {
            writer,
            timing,
            last_send: None,
        }
    }

    /// The timing contract in force.
    pub fn timing(&self) -> &SendTiming {
        &self.timing
    }

    /// When the last frame's header started transmitting.
    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Transmit one command body as a complete frame.
    ///
    /// Writes the preamble byte alone, then `*AV2 ` + `body` + terminator,
    /// sleeping as the timing contract requires. A write failure aborts the
    /// send; a half-sent frame is left for the device to time out.
    pub async fn send(&mut self, body: &[u8]) -> Result<()> {
        let wait = self
            .timing
            .wait_before_preamble(self.last_send.map(|t| t.elapsed()));
        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Waiting for inter-command gap");
            tokio::time::sleep(wait).await;
        }

        // Measured again: the sleep may have overshot into the cold range.
        let since_last = self.last_send.map(|t| t.elapsed());
        let cold = self.timing.is_cold(since_last);
        tracing::debug!(
            since_last_ms = since_last.map(|d| d.as_millis() as u64),
            cold,
            body = ?body,
            "Sending command"
        );

        self.writer.send(&[COMMAND_PREAMBLE]).await?;
        if cold {
            tokio::time::sleep(self.timing.preamble_pause).await;
        }

        let frame = encode_command_frame(body);
        self.last_send = Some(Instant::now());
        self.writer.send(&frame).await
    }

    /// Consume the sender and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naim_core::error::Error;
    use naim_test_harness::{DeviceTimingDouble, MockWriter};

    const MS: Duration = Duration::from_millis(1);

    // ---------------------------------------------------------------
    // SendTiming decisions
    // ---------------------------------------------------------------

    #[test]
    fn first_send_is_cold_and_immediate() {
        let t = SendTiming::default();
        assert_eq!(t.wait_before_preamble(None), Duration::ZERO);
        assert!(t.is_cold(None));
    }

    #[test]
    fn wait_fills_up_to_min_gap() {
        let t = SendTiming::default();
        assert_eq!(t.wait_before_preamble(Some(Duration::ZERO)), 100 * MS);
        assert_eq!(t.wait_before_preamble(Some(40 * MS)), 60 * MS);
        assert_eq!(t.wait_before_preamble(Some(100 * MS)), Duration::ZERO);
        assert_eq!(t.wait_before_preamble(Some(5000 * MS)), Duration::ZERO);
    }

    #[test]
    fn warm_window_boundaries() {
        let t = SendTiming::default();
        assert!(!t.is_cold(Some(100 * MS)));
        assert!(!t.is_cold(Some(150 * MS)));
        assert!(!t.is_cold(Some(195 * MS)));
        assert!(t.is_cold(Some(196 * MS)));
        assert!(t.is_cold(Some(200 * MS)));
        assert!(t.is_cold(Some(10_000 * MS)));
    }

    // ---------------------------------------------------------------
    // TimedSender on the virtual clock
    // ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn cold_send_pauses_after_preamble() {
        let (writer, log) = MockWriter::new();
        let mut sender = TimedSender::new(writer, SendTiming::default());

        sender.send(&[0x24]).await.unwrap();

        let writes = log.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].data, vec![b'*']);
        assert_eq!(writes[1].data, b"*AV2 \x24\xff".to_vec());
        assert!(writes[1].at - writes[0].at >= 25 * MS);
        assert_eq!(sender.last_send(), Some(writes[1].at));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_sends_are_spaced_by_min_gap() {
        let (writer, log) = MockWriter::new();
        let mut sender = TimedSender::new(writer, SendTiming::default());

        for _ in 0..4 {
            sender.send(&[0x24]).await.unwrap();
        }

        let headers = log.headers();
        assert_eq!(headers.len(), 4);
        for pair in headers.windows(2) {
            assert!(pair[1].at - pair[0].at >= 100 * MS);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn warm_send_has_no_preamble_pause() {
        let (writer, log) = MockWriter::new();
        let mut sender = TimedSender::new(writer, SendTiming::default());

        sender.send(&[0x24]).await.unwrap();
        tokio::time::sleep(150 * MS).await;
        sender.send(&[0x25]).await.unwrap();

        let writes = log.writes();
        assert_eq!(writes.len(), 4);
        // Preamble went out at once; header followed with no pause.
        assert_eq!(writes[2].at - writes[1].at, 150 * MS);
        assert_eq!(writes[3].at, writes[2].at);
    }

    #[tokio::test(start_paused = true)]
    async fn late_send_is_cold_again() {
        let (writer, log) = MockWriter::new();
        let mut sender = TimedSender::new(writer, SendTiming::default());

        sender.send(&[0x24]).await.unwrap();
        tokio::time::sleep(300 * MS).await;
        sender.send(&[0x25]).await.unwrap();

        let writes = log.writes();
        assert_eq!(writes.len(), 4);
        assert!(writes[3].at - writes[2].at >= 25 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_satisfy_device_timing() {
        let (double, report) = DeviceTimingDouble::new();
        let mut sender = TimedSender::new(double, SendTiming::default());

        for _ in 0..3 {
            sender.send(&[0x24]).await.unwrap();
        }
        tokio::time::sleep(300 * MS).await;
        for _ in 0..3 {
            sender.send(&[0x23, 0x32]).await.unwrap();
        }
        tokio::time::sleep(150 * MS).await;
        sender.send(&[0x69]).await.unwrap();

        assert_eq!(report.accepted(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_propagates() {
        let (mut writer, log) = MockWriter::new();
        writer.fail_after(1);
        let mut sender = TimedSender::new(writer, SendTiming::default());

        let result = sender.send(&[0x24]).await;
        assert!(matches!(result, Err(Error::Io(_))));
        // Only the preamble reached the line.
        assert_eq!(log.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timing_is_honoured() {
        let timing = SendTiming {
            min_gap: 50 * MS,
            warm_window: 80 * MS,
            transmit_allowance: Duration::ZERO,
            preamble_pause: 10 * MS,
        };
        let (writer, log) = MockWriter::new();
        let mut sender = TimedSender::new(writer, timing);

        sender.send(&[0x24]).await.unwrap();
        sender.send(&[0x24]).await.unwrap();

        let writes = log.writes();
        assert_eq!(writes[1].at - writes[0].at, 10 * MS);
        assert_eq!(writes[2].at - writes[1].at, 50 * MS);
        assert_eq!(writes[3].at, writes[2].at);
    }
}
