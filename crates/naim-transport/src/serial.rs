//! Serial port transport for the amplifier's RS-232 control port.
//!
//! The AV2 control port runs at 9600 baud, 8 data bits, 1 stop bit, no parity
//! and no flow control. [`SerialTransport`] opens the port with those defaults
//! and splits it into a [`SerialReader`] for the read loop and a
//! [`SerialWriter`] for command senders.
//!
//! # Example
//!
//! ```no_run
//! use naim_transport::SerialTransport;
//!
//! # async fn example() -> naim_core::Result<()> {
//! let transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//! let (reader, writer) = transport.into_split();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use naim_core::error::{Error, Result};
use naim_core::transport::{TransportReader, TransportWriter};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::stream::{StreamReader, StreamWriter};

/// Logs the port closing once the last owner of the port is dropped.
#[derive(Debug)]
struct PortGuard {
    port_name: String,
}

impl Drop for PortGuard {
    fn drop(&mut self) {
        tracing::info!(port = %self.port_name, "Serial port closed");
    }
}

/// Inbound half of an open serial port.
pub struct SerialReader {
    inner: StreamReader<ReadHalf<SerialStream>>,
    _port: Arc<PortGuard>,
}

#[async_trait]
impl TransportReader for SerialReader {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.receive(buf).await
    }
}

/// Outbound half of an open serial port.
pub struct SerialWriter {
    inner: StreamWriter<WriteHalf<SerialStream>>,
    _port: Arc<PortGuard>,
}

#[async_trait]
impl TransportWriter for SerialWriter {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.inner.send(data).await
    }
}

/// Serial port configuration.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (the amplifier ships configured for 9600).
    pub baud_rate: u32,
    /// Number of data bits.
    pub data_bits: DataBits,
    /// Number of stop bits.
    pub stop_bits: StopBits,
    /// Parity checking.
    pub parity: Parity,
    /// Flow control.
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// An open serial connection to the amplifier.
///
/// The port closes when the transport, or both halves from
/// [`into_split`](Self::into_split), have been dropped.
pub struct SerialTransport {
    stream: SerialStream,
    port: Arc<PortGuard>,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default line settings.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity)
            .flow_control(config.flow_control)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("unable to open serial port {port}: {e}"))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            stream,
            port: Arc::new(PortGuard {
                port_name: port.to_string(),
            }),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port.port_name
    }

    /// Split the port into independently owned read and write halves.
    ///
    /// The port is closed once both halves have been dropped.
    pub fn into_split(self) -> (SerialReader, SerialWriter) {
        tracing::debug!(port = %self.port.port_name, "Splitting serial port");
        let (read, write) = tokio::io::split(self.stream);
        let reader = SerialReader {
            inner: StreamReader::new(read),
            _port: Arc::clone(&self.port),
        };
        let writer = SerialWriter {
            inner: StreamWriter::new(write),
            _port: self.port,
        };
        (reader, writer)
    }
}
