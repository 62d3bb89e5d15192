//! Transport implementations for Naim amplifier control.
//!
//! This crate provides concrete implementations of the
//! [`TransportReader`](naim_core::TransportReader) and
//! [`TransportWriter`](naim_core::TransportWriter) traits:
//!
//! - [`SerialTransport`]: the amplifier's RS-232 port (USB adapters included),
//!   split into a [`SerialReader`] and [`SerialWriter`]
//! - [`StreamReader`] / [`StreamWriter`]: wrappers over any tokio
//!   `AsyncRead` / `AsyncWrite`, useful for pipes, sockets and in-memory
//!   duplex streams
//!
//! # Example
//!
//! ```no_run
//! use naim_core::{TransportReader, TransportWriter};
//! use naim_transport::SerialTransport;
//!
//! # async fn example() -> naim_core::Result<()> {
//! let (mut reader, mut writer) = SerialTransport::open("/dev/ttyS0", 9600)
//!     .await?
//!     .into_split();
//!
//! writer.send(b"*").await?;
//!
//! let mut buf = [0u8; 64];
//! let n = reader.receive(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;
pub mod stream;

pub use serial::{SerialConfig, SerialReader, SerialTransport, SerialWriter};
pub use stream::{StreamReader, StreamWriter};
