//! A writer that enforces the amplifier's command timing.
//!
//! The real amplifier drops commands that arrive too close together, or
//! whose header does not follow the preamble with the right delay, without
//! reporting anything. [`DeviceTimingDouble`] applies the same checks to
//! every byte it is given and fails the write instead, so a test can tell a
//! correct sender from one that only looks correct on the wire.
//!
//! The checks, per command:
//!
//! - The first byte must be the `*` preamble.
//! - The preamble must arrive at least 100 ms after the previous command's
//!   header.
//! - If the previous header was more than 200 ms ago (or there was none),
//!   the header must trail the preamble by at least 25 ms.
//! - Otherwise the header must follow the preamble within 5 ms.
//!
//! A violation resets the double, as if the device had discarded the
//! partial command.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use naim_core::error::{Error, Result};
use naim_core::transport::TransportWriter;
use tokio::time::Instant;

const PREAMBLE: u8 = b'*';
const TERMINATOR: u8 = 0xFF;

const MIN_GAP: Duration = Duration::from_millis(100);
const WARM_WINDOW: Duration = Duration::from_millis(200);
const COLD_PAUSE: Duration = Duration::from_millis(25);
const WARM_SLACK: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingPreamble,
    Header,
    Started,
}

#[derive(Debug, Default)]
struct Accepted {
    frames: Vec<Vec<u8>>,
    violations: Vec<String>,
}

/// Shared view of what a [`DeviceTimingDouble`] accepted and rejected.
#[derive(Debug, Clone, Default)]
pub struct TimingReport {
    inner: Arc<Mutex<Accepted>>,
}

impl TimingReport {
    fn lock(&self) -> MutexGuard<'_, Accepted> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of complete commands received with valid timing.
    pub fn accepted(&self) -> usize {
        self.lock().frames.len()
    }

    /// Each accepted command from its header through the terminator.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().frames.clone()
    }

    /// Messages for every timing violation seen so far.
    pub fn violations(&self) -> Vec<String> {
        self.lock().violations.clone()
    }
}

/// A [`TransportWriter`] that validates the device's timing contract.
#[derive(Debug)]
pub struct DeviceTimingDouble {
    state: State,
    last_preamble: Option<Instant>,
    last_command: Option<Instant>,
    current: Vec<u8>,
    report: TimingReport,
}

impl DeviceTimingDouble {
    /// Create a double and the report handle that observes it.
    pub fn new() -> (Self, TimingReport) {
        let report = TimingReport::default();
        let double = DeviceTimingDouble {
            state: State::AwaitingPreamble,
            last_preamble: None,
            last_command: None,
            current: Vec::new(),
            report: report.clone(),
        };
        (double, report)
    }

    fn reset(&mut self) {
        self.state = State::AwaitingPreamble;
        self.last_preamble = None;
        self.last_command = None;
        self.current.clear();
    }

    fn reject(&mut self, message: &str) -> Error {
        self.reset();
        self.report.lock().violations.push(message.to_string());
        Error::Transport(message.to_string())
    }

    fn accept_byte(&mut self, byte: u8, now: Instant) -> Result<()> {
        match self.state {
            State::AwaitingPreamble => {
                if byte != PREAMBLE {
                    return Err(self.reject("expecting preamble"));
                }
                if self.last_command.is_some_and(|last| now < last + MIN_GAP) {
                    return Err(self.reject("next message being received too soon"));
                }
                self.last_preamble = Some(now);
                self.state = State::Header;
            }
            State::Header => {
                let preamble = self.last_preamble.unwrap_or(now);
                let cold = self.last_command.is_none_or(|last| now > last + WARM_WINDOW);
                let warm = self.last_command.is_some_and(|last| now < last + WARM_WINDOW);

                if cold && now < preamble + COLD_PAUSE {
                    return Err(self.reject("message received too soon after preamble"));
                }
                if warm && now > preamble + WARM_SLACK {
                    return Err(self.reject(
                        "message should follow preamble without delay, when received within 200ms",
                    ));
                }
                self.last_command = Some(now);
                self.current.clear();
                self.current.push(byte);
                self.state = State::Started;
            }
            State::Started => {
                self.current.push(byte);
                if byte == TERMINATOR {
                    let frame = std::mem::take(&mut self.current);
                    self.report.lock().frames.push(frame);
                    self.state = State::AwaitingPreamble;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransportWriter for DeviceTimingDouble {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let now = Instant::now();
        for &byte in data {
            self.accept_byte(byte, now)?;
        }
        Ok(())
    }
}
