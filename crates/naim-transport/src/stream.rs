//! Transport halves over generic tokio streams.
//!
//! [`StreamReader`] and [`StreamWriter`] adapt any `AsyncRead` / `AsyncWrite`
//! to the transport traits. The serial transport is built from them, and they
//! also let the protocol engine run over `tokio::io::duplex` pipes or sockets.

use async_trait::async_trait;
use naim_core::error::{Error, Result};
use naim_core::transport::{TransportReader, TransportWriter};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Inbound transport half over an `AsyncRead`.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
}

impl<R> StreamReader<R> {
    /// Wrap a readable stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consume the wrapper and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TransportReader for StreamReader<R> {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf).await {
                Ok(n) => {
                    tracing::trace!(bytes = n, data = ?&buf[..n], "Received data");
                    return Ok(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive data");
                    return Err(map_io_error(e));
                }
            }
        }
    }
}

/// Outbound transport half over an `AsyncWrite`.
#[derive(Debug)]
pub struct StreamWriter<W> {
    inner: W,
}

impl<W> StreamWriter<W> {
    /// Wrap a writable stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consume the wrapper and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> TransportWriter for StreamWriter<W> {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        tracing::trace!(bytes = data.len(), data = ?data, "Sending data");

        self.inner.write_all(data).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        // The device timing contract is measured on the line, so nothing may
        // sit in a buffer.
        self.inner.flush().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to flush");
            Error::Io(e)
        })?;

        Ok(())
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionReset => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
