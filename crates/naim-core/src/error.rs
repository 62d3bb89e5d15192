//! Error types for Naim amplifier control.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, frame-format
//! failures, payload-shape failures, argument-range failures and handler
//! failures each have their own variant so callers can tell them apart
//! without inspecting adapter state.

/// Error reported by a registered response handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for all Naim operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open failure, protocol violation
    /// reported by the far end).
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the amplifier was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The inbound stream ended cleanly between frames.
    ///
    /// This is not a failure: read loops use it as their termination signal.
    #[error("end of stream")]
    EndOfStream,

    /// The transport failed while a frame was being read.
    #[error("unable to read complete naim message: {source}")]
    Read {
        /// The transport's own error.
        #[source]
        source: Box<Error>,
    },

    /// An inbound frame was malformed.
    #[error("invalid naim message: {0}")]
    Frame(#[from] FrameError),

    /// A known message type arrived with the wrong payload length.
    #[error("unable to parse data for message type 0x{code:02X}: expected length {expected} but received {actual}")]
    PayloadLength {
        /// Message-type code of the offending frame.
        code: u8,
        /// Payload length the message type requires.
        expected: usize,
        /// Payload length actually received.
        actual: usize,
    },

    /// A registered handler reported a failure.
    #[error("unable to call {kind} handlers for message type 0x{code:02X}: {source}")]
    Handler {
        /// Which handler list was being dispatched ("system status", "unknown response").
        kind: &'static str,
        /// Message-type code of the frame being dispatched.
        code: u8,
        /// The handler's own error.
        #[source]
        source: HandlerError,
    },

    /// A volume level outside 0-99 was requested.
    #[error("level must be between 0 and 99, got {0}")]
    VolumeOutOfRange(i32),

    /// An invalid parameter was passed to a command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for the clean end-of-stream signal.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

/// Ways an inbound frame can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame (terminator included) is shorter than the protocol minimum.
    #[error("message below minimum length ({len} < {min})")]
    BelowMinimumLength {
        /// Length of the received frame.
        len: usize,
        /// Minimum valid frame length.
        min: usize,
    },

    /// The frame did not begin with the response preamble.
    #[error("unexpected message start: {start:02X?}")]
    UnexpectedStart {
        /// The first bytes of the frame.
        start: Vec<u8>,
    },

    /// The stream ended part way through a frame.
    #[error("stream ended after {len} bytes without a terminator")]
    Truncated {
        /// Bytes buffered when the stream ended.
        len: usize,
    },

    /// Too many bytes arrived without a terminator; the buffer was discarded.
    #[error("no terminator within {len} bytes")]
    Unterminated {
        /// Bytes discarded.
        len: usize,
    },
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
