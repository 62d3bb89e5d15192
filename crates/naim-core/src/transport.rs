//! Transport traits for amplifier communication.
//!
//! The amplifier link is a half-duplex serial line, but the two directions
//! are used by different parts of the system: a long-lived read loop owns the
//! inbound half exclusively, while command senders share the outbound half.
//! The transport is therefore modelled as two traits, [`TransportReader`] and
//! [`TransportWriter`], so each half can be owned independently.
//!
//! Concrete implementations live in `naim-transport` (serial ports, generic
//! tokio streams) and `naim-test-harness` (mocks).

use async_trait::async_trait;

use crate::error::Result;

/// Inbound half of a byte-stream transport.
#[async_trait]
pub trait TransportReader: Send {
    /// Receive bytes into `buf`, waiting until at least one byte is available.
    ///
    /// Returns `Ok(0)` when the stream has ended. There is no timeout: a read
    /// loop may stay suspended here until data arrives or the transport is
    /// closed.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Outbound half of a byte-stream transport.
#[async_trait]
pub trait TransportWriter: Send {
    /// Write all of `data` and flush it to the line immediately.
    async fn send(&mut self, data: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: TransportReader + ?Sized> TransportReader for Box<T> {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(buf).await
    }
}

#[async_trait]
impl<T: TransportWriter + ?Sized> TransportWriter for Box<T> {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data).await
    }
}
