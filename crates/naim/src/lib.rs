//! # naim -- Async Control for Naim Amplifiers
//!
//! `naim` drives Naim AV2 processors over their RS-232 control port: power,
//! mute, input selection, volume, and the system status reports the
//! amplifier sends back.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use naim::{Av2Builder, Input};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let amp = Arc::new(
//!         Av2Builder::new()
//!             .serial_port("/dev/ttyS0")
//!             .on_system_status(|status| {
//!                 println!("{status}");
//!                 Ok(())
//!             })
//!             .build()
//!             .await?,
//!     );
//!
//!     // Responses are read and dispatched on their own task.
//!     let reader = tokio::spawn({
//!         let amp = amp.clone();
//!         async move { amp.read_all().await }
//!     });
//!
//!     amp.set_standby(false).await?;
//!     amp.set_input(Input::Op1).await?;
//!     amp.set_volume(40).await?;
//!     amp.query_status().await?;
//!
//!     reader.await??;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate               | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | `naim-core`         | Error type, transport reader/writer traits       |
//! | `naim-transport`    | Serial port and generic async stream transports  |
//! | `naim-av2`          | AV2 framing, decoding, dispatch, timed sending   |
//! | `naim-test-harness` | Mock transports and a device timing double       |
//! | **`naim`**          | This facade crate -- re-exports everything       |
//!
//! ## Timing
//!
//! The amplifier ignores commands sent too close together. Every command
//! goes through a [`TimedSender`] that keeps at least 100 ms between
//! commands and pauses 25 ms after the preamble of a command that does not
//! follow another within 200 ms. Concurrent callers are queued, so an
//! `Arc<NaimAv2>` can be used from any number of tasks.

pub use naim_core::{Error, FrameError, HandlerError, Result, TransportReader, TransportWriter};

pub use naim_av2::{
    Av2Builder, Command, Frame, FrameReader, HandlerResult, Input, NaimAv2, Response,
    ResponseKind, SendTiming, SystemStatus, TimedSender, UnknownResponse,
};

/// The AV2 protocol engine, for access beyond the top-level re-exports.
pub mod av2 {
    pub use naim_av2::*;
}

/// Transport implementations.
pub mod transport {
    pub use naim_transport::*;
}
