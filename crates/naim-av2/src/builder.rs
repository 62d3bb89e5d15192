//! Av2Builder -- fluent builder for constructing [`NaimAv2`] instances.
//!
//! Collects serial parameters, the send timing contract and response
//! handlers before the port is opened, so the adapter comes out of
//! [`build`](Av2Builder::build) ready to share.
//!
//! # Example
//!
//! ```no_run
//! use naim_av2::builder::Av2Builder;
//!
//! # async fn example() -> naim_core::Result<()> {
//! let amp = Av2Builder::new()
//!     .serial_port("/dev/ttyS0")
//!     .on_system_status(|status| {
//!         println!("{status}");
//!         Ok(())
//!     })
//!     .build()
//!     .await?;
//! amp.query_status().await?;
//! # Ok(())
//! # }
//! ```

use naim_core::error::{Error, Result};
use naim_core::transport::{TransportReader, TransportWriter};
use naim_transport::{SerialConfig, SerialTransport};

use crate::amp::NaimAv2;
use crate::dispatch::{Dispatcher, HandlerResult};
use crate::response::{SystemStatus, UnknownResponse};
use crate::sender::SendTiming;

/// Fluent builder for [`NaimAv2`].
///
/// Defaults to 9600 baud 8N1 and the standard AV2 timing.
#[derive(Debug, Default)]
pub struct Av2Builder {
    serial_port: Option<String>,
    serial_config: SerialConfig,
    timing: SendTiming,
    dispatcher: Dispatcher,
}

impl Av2Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serial port path (e.g. `/dev/ttyS0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial_config.baud_rate = baud;
        self
    }

    /// Replace the full serial line configuration.
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = config;
        self
    }

    /// Override the inter-command timing contract.
    pub fn timing(mut self, timing: SendTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Register a system status handler on the adapter being built.
    pub fn on_system_status<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SystemStatus) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_system_status(handler);
        self
    }

    /// Register an unknown response handler on the adapter being built.
    pub fn on_unknown<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UnknownResponse) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_unknown(handler);
        self
    }

    /// Build a [`NaimAv2`] over a caller-provided reader and writer.
    ///
    /// This is the entry point for tests (pass the mocks from
    /// `naim-test-harness`) and for transports other than a local serial
    /// port.
    pub fn build_with_transport<R, W>(self, reader: R, writer: W) -> NaimAv2
    where
        R: TransportReader + 'static,
        W: TransportWriter + 'static,
    {
        NaimAv2::from_parts(Box::new(reader), Box::new(writer), self.timing, self.dispatcher)
    }

    /// Open the serial port and build a [`NaimAv2`] over it.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<NaimAv2> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open_with_config(port, self.serial_config.clone()).await?;
        tracing::debug!(port, "Serial link ready for AV2");
        let (reader, writer) = transport.into_split();
        Ok(self.build_with_transport(reader, writer))
    }
}
