//! naim-core: Core error definitions and transport traits for Naim amplifier
//! control.
//!
//! This crate holds the pieces every other crate in the workspace shares: the
//! error taxonomy and the split byte-stream transport traits. Protocol engines
//! depend on these types without pulling in a concrete serial port.
//!
//! # Key types
//!
//! - [`TransportReader`] / [`TransportWriter`] -- the two halves of a duplex byte stream
//! - [`Error`] / [`FrameError`] / [`Result`] -- error handling

pub mod error;
pub mod transport;

pub use error::{Error, FrameError, HandlerError, Result};
pub use transport::{TransportReader, TransportWriter};
