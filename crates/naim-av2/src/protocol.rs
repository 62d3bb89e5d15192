//! AV2 frame encoder/decoder.
//!
//! The AV2 serial protocol exchanges binary frames terminated by `0xFF`.
//! This module handles the byte-level shape of both directions and the
//! [`FrameReader`] that pulls one complete inbound frame at a time off a
//! [`TransportReader`].
//!
//! # Inbound (amplifier to controller)
//!
//! ```text
//! '#' 'A' 'V' '2' ' ' <code> [<payload>...] 0xFF
//! ```
//!
//! - Preamble: the 5-byte literal `#AV2 `, which carries the device address
//! - `code`: message-type byte
//! - `payload`: 0-26 bytes, never `0xFF`
//! - Terminator: `0xFF`
//!
//! # Outbound (controller to amplifier)
//!
//! ```text
//! '*' | '*' 'A' 'V' '2' ' ' <opcode> [<arg>] 0xFF
//! ```
//!
//! The leading `*` is written on its own before the header; see
//! [`sender`](crate::sender) for the timing between the two writes.

use bytes::{Buf, BufMut, BytesMut};
use naim_core::error::{Error, FrameError, Result};
use naim_core::transport::TransportReader;

/// Literal start of every inbound frame.
pub const RESPONSE_PREAMBLE: &[u8; 5] = b"#AV2 ";

/// Literal header of every outbound frame.
pub const COMMAND_HEADER: &[u8; 5] = b"*AV2 ";

/// Byte written alone ahead of every outbound header.
pub const COMMAND_PREAMBLE: u8 = b'*';

/// Frame terminator byte (both directions).
pub const TERMINATOR: u8 = 0xFF;

/// Shortest valid inbound frame: preamble, message-type code, terminator.
pub const MIN_FRAME_LEN: usize = RESPONSE_PREAMBLE.len() + 2;

/// Bytes the reader will buffer while looking for a terminator.
const MAX_BUFFERED: usize = 256;

const READ_CHUNK_SIZE: usize = 64;

/// A validated inbound frame with preamble and terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message-type code.
    pub code: u8,
    /// Payload bytes following the code (may be empty).
    pub payload: Vec<u8>,
}

/// Validate one raw inbound frame and split it into code and payload.
///
/// `raw` must run up to and including the terminator, as delivered by
/// [`FrameReader`].
///
/// # Example
///
/// ```
/// use naim_av2::protocol::parse_frame;
///
/// let frame = parse_frame(b"#AV2 \x69\x81\x87\xb2\x02\xff").unwrap();
/// assert_eq!(frame.code, 0x69);
/// assert_eq!(frame.payload, vec![0x81, 0x87, 0xB2, 0x02]);
/// ```
pub fn parse_frame(raw: &[u8]) -> Result<Frame> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(FrameError::BelowMinimumLength {
            len: raw.len(),
            min: MIN_FRAME_LEN,
        }
        .into());
    }

    let (start, rest) = raw.split_at(RESPONSE_PREAMBLE.len());
    if start != RESPONSE_PREAMBLE {
        return Err(FrameError::UnexpectedStart {
            start: start.to_vec(),
        }
        .into());
    }

    // Length check above guarantees the code byte and the terminator.
    let body = &rest[..rest.len() - 1];
    Ok(Frame {
        code: body[0],
        payload: body[1..].to_vec(),
    })
}

/// Build the outbound header: `*AV2 ` + `body` + terminator.
///
/// `body` is the output of the command encoder (opcode plus optional
/// argument). The separate leading preamble byte is not included.
///
/// # Example
///
/// ```
/// use naim_av2::protocol::encode_command_frame;
///
/// assert_eq!(encode_command_frame(&[0x24]), b"*AV2 \x24\xff".to_vec());
/// ```
pub fn encode_command_frame(body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(COMMAND_HEADER.len() + body.len() + 1);
    buf.put_slice(COMMAND_HEADER);
    buf.put_slice(body);
    buf.put_u8(TERMINATOR);
    buf.to_vec()
}

/// Reads complete AV2 frames from a [`TransportReader`].
///
/// Bytes past a terminator stay buffered for the next call, so callers always
/// get exactly one frame per [`read_frame`](Self::read_frame). A frame that
/// fails validation has already been consumed, so the next read starts at the
/// following frame. This holds for runaway input too: after an
/// [`FrameError::Unterminated`] discard, the rest of that frame is skipped
/// through its terminator.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    /// Set after a runaway discard until the next terminator is seen.
    skipping: bool,
}

impl<R: TransportReader> FrameReader<R> {
    /// Wrap a transport reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_BUFFERED),
            skipping: false,
        }
    }

    /// Read raw bytes up to and including the next terminator.
    ///
    /// Returns [`Error::EndOfStream`] if the stream ends with nothing
    /// buffered, and [`FrameError::Truncated`] if it ends mid-frame.
    /// Transport failures are wrapped in [`Error::Read`].
    pub async fn read_raw(&mut self) -> Result<Vec<u8>> {
        loop {
            let terminator = self.buf.iter().position(|&b| b == TERMINATOR);

            if self.skipping {
                match terminator {
                    Some(pos) => {
                        tracing::debug!(bytes = pos + 1, "Skipped tail of discarded frame");
                        self.buf.advance(pos + 1);
                        self.skipping = false;
                        continue;
                    }
                    None => self.buf.clear(),
                }
            } else if let Some(pos) = terminator {
                return Ok(self.buf.split_to(pos + 1).to_vec());
            }

            if self.buf.len() > MAX_BUFFERED {
                let len = self.buf.len();
                tracing::warn!(len, "no terminator in read buffer, discarding");
                self.buf.clear();
                self.skipping = true;
                return Err(FrameError::Unterminated { len }.into());
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let n = self
                .inner
                .receive(&mut chunk)
                .await
                .map_err(|source| Error::Read {
                    source: Box::new(source),
                })?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Err(Error::EndOfStream);
                }
                let len = self.buf.len();
                self.buf.clear();
                return Err(FrameError::Truncated { len }.into());
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read and validate the next frame.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let raw = self.read_raw().await?;
        let frame = parse_frame(&raw)?;
        tracing::trace!(code = frame.code, payload = ?frame.payload, "Decoded frame");
        Ok(frame)
    }

    /// Consume the frame reader and return the underlying reader.
    ///
    /// Any partially buffered frame is discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
