//! Naim AV2 serial protocol engine.
//!
//! This crate implements the binary control protocol spoken by Naim AV2
//! processors over RS-232. It provides:
//!
//! - **Frame codec** ([`protocol`]) -- the `#AV2 ` inbound frame shape, the
//!   `*AV2 ` outbound envelope and a [`FrameReader`] that pulls one
//!   terminated frame at a time off a transport.
//! - **Response decoding** ([`response`]) -- interpret the system status
//!   report (power, input, mute, volume); every other message type is
//!   passed through as an [`UnknownResponse`].
//! - **Command encoding** ([`commands`]) -- opcode bodies for power, mute,
//!   input select, volume and status query.
//! - **Dispatch** ([`dispatch`]) -- ordered per-kind handler lists invoked by
//!   the read loop.
//! - **Timed sending** ([`sender`]) -- the preamble pause and inter-command
//!   gap the amplifier requires.
//! - **NaimAv2** ([`amp`]) -- the adapter tying these together, and
//!   **Av2Builder** ([`builder`]) to construct it over a serial port.
//!
//! # Example
//!
//! ```
//! use naim_av2::commands::{encode_command, Command};
//! use naim_av2::protocol::{encode_command_frame, parse_frame};
//!
//! // Build the frame for "volume 50"
//! let body = encode_command(Command::Volume(50)).unwrap();
//! assert_eq!(encode_command_frame(&body), b"*AV2 \x23\x32\xff".to_vec());
//!
//! // Parse a status report from the amplifier
//! let frame = parse_frame(b"#AV2 \x69\x81\x87\xb2\x02\xff").unwrap();
//! assert_eq!(frame.code, 0x69);
//! assert_eq!(frame.payload, vec![0x81, 0x87, 0xb2, 0x02]);
//! ```

pub mod amp;
pub mod builder;
pub mod commands;
pub mod dispatch;
pub mod protocol;
pub mod response;
pub mod sender;

pub use amp::NaimAv2;
pub use builder::Av2Builder;
pub use commands::Command;
pub use dispatch::{Dispatcher, HandlerResult};
pub use protocol::{Frame, FrameReader};
pub use response::{Input, Response, ResponseKind, SystemStatus, UnknownResponse};
pub use sender::{SendTiming, TimedSender};
