//! naim-test-harness: mock transports and a device timing double for
//! naim-av2.
//!
//! [`MockReader`] and [`MockWriter`] stand in for the two halves of a serial
//! link so protocol code can be tested without an amplifier.
//! [`DeviceTimingDouble`] goes further and rejects writes that break the
//! amplifier's inter-command timing, the way the real device silently
//! ignores them.

pub mod mock_serial;
pub mod timing_double;

pub use mock_serial::{MockReader, MockWriter, SentLog, SentWrite};
pub use timing_double::{DeviceTimingDouble, TimingReport};
