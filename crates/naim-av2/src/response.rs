//! Response decoding and status field accessors.
//!
//! Only one inbound message type, system status, has a known layout. Every
//! other message type is preserved verbatim as an [`UnknownResponse`] so
//! undocumented messages still reach the application.
//!
//! # System status payload
//!
//! ```text
//! byte 0  bit 7     set when the amplifier is on (clear in standby)
//! byte 1  bits 0-3  selected input code
//! byte 2  bit 7     mute flag
//!         bits 0-6  volume (reported values above 99 are clamped)
//! byte 3            reserved
//! ```

use std::fmt;
use std::str::FromStr;

use naim_core::error::{Error, Result};

/// Message-type code of the system status response.
pub const RESPONSE_SYSTEM_STATUS: u8 = 0x69;

/// Payload length of the system status response.
pub const SYSTEM_STATUS_LEN: usize = 4;

/// Highest volume level the amplifier accepts or reports.
pub const MAX_VOLUME: u8 = 99;

const INPUT_CODE_VIP1: u8 = 0x1;
const INPUT_CODE_VIP2: u8 = 0x2;
const INPUT_CODE_OP1: u8 = 0x7;
const INPUT_CODE_OP2: u8 = 0x8;

/// A selectable amplifier input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Vip1,
    Vip2,
    Op1,
    Op2,
    /// The status report carried an input code this library does not know.
    Unknown,
}

impl Input {
    /// Map a 4-bit status input code to an input. Never fails.
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            INPUT_CODE_VIP1 => Input::Vip1,
            INPUT_CODE_VIP2 => Input::Vip2,
            INPUT_CODE_OP1 => Input::Op1,
            INPUT_CODE_OP2 => Input::Op2,
            _ => Input::Unknown,
        }
    }

    /// The status input code, or `None` for [`Input::Unknown`].
    pub fn code(self) -> Option<u8> {
        match self {
            Input::Vip1 => Some(INPUT_CODE_VIP1),
            Input::Vip2 => Some(INPUT_CODE_VIP2),
            Input::Op1 => Some(INPUT_CODE_OP1),
            Input::Op2 => Some(INPUT_CODE_OP2),
            Input::Unknown => None,
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Input::Vip1 => "VIP1",
            Input::Vip2 => "VIP2",
            Input::Op1 => "OP1",
            Input::Op2 => "OP2",
            Input::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for Input {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vip1" => Ok(Input::Vip1),
            "vip2" => Ok(Input::Vip2),
            "op1" => Ok(Input::Op1),
            "op2" => Ok(Input::Op2),
            _ => Err(Error::InvalidParameter(format!("unknown input {s:?}"))),
        }
    }
}

/// A decoded system status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemStatus {
    status: [u8; SYSTEM_STATUS_LEN],
}

impl SystemStatus {
    /// Wrap a raw 4-byte status payload.
    pub fn new(status: [u8; SYSTEM_STATUS_LEN]) -> Self {
        Self { status }
    }

    /// `true` when the amplifier is in standby.
    pub fn standby(&self) -> bool {
        self.status[0] & 0x80 == 0
    }

    /// `true` when the amplifier is powered on.
    pub fn is_on(&self) -> bool {
        !self.standby()
    }

    /// The selected input.
    pub fn input(&self) -> Input {
        Input::from_code(self.status[1])
    }

    /// `true` when the output is muted.
    pub fn muted(&self) -> bool {
        self.status[2] & 0x80 != 0
    }

    /// Volume level in `0..=99`.
    pub fn volume(&self) -> u8 {
        (self.status[2] & 0x7F).min(MAX_VOLUME)
    }

    /// The raw payload bytes.
    pub fn raw(&self) -> &[u8; SYSTEM_STATUS_LEN] {
        &self.status
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "power={} input={} volume={} muted={}",
            if self.standby() { "standby" } else { "on" },
            self.input(),
            self.volume(),
            self.muted()
        )
    }
}

/// A message type this library does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResponse {
    /// Message-type code as received.
    pub code: u8,
    /// Payload bytes as received.
    pub payload: Vec<u8>,
}

/// Which handler list a response is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    SystemStatus,
    Unknown,
}

impl ResponseKind {
    /// Human-readable name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            ResponseKind::SystemStatus => "system status",
            ResponseKind::Unknown => "unknown response",
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    SystemStatus(SystemStatus),
    Unknown(UnknownResponse),
}

impl Response {
    /// The handler list this response belongs to.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::SystemStatus(_) => ResponseKind::SystemStatus,
            Response::Unknown(_) => ResponseKind::Unknown,
        }
    }

    /// The message-type code this response was decoded from.
    pub fn code(&self) -> u8 {
        match self {
            Response::SystemStatus(_) => RESPONSE_SYSTEM_STATUS,
            Response::Unknown(unknown) => unknown.code,
        }
    }
}

/// Decode a message-type code and payload into a [`Response`].
///
/// System status payloads must be exactly four bytes. Any other code always
/// succeeds and yields an [`UnknownResponse`] carrying the payload unchanged.
///
/// # Example
///
/// ```
/// use naim_av2::response::{decode_response, Input, Response};
///
/// match decode_response(0x69, &[0x81, 0x87, 0xB2, 0x02]).unwrap() {
///     Response::SystemStatus(status) => {
///         assert_eq!(status.input(), Input::Op1);
///         assert_eq!(status.volume(), 50);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn decode_response(code: u8, payload: &[u8]) -> Result<Response> {
    match code {
        RESPONSE_SYSTEM_STATUS => {
            let status: [u8; SYSTEM_STATUS_LEN] =
                payload.try_into().map_err(|_| Error::PayloadLength {
                    code,
                    expected: SYSTEM_STATUS_LEN,
                    actual: payload.len(),
                })?;
            Ok(Response::SystemStatus(SystemStatus::new(status)))
        }
        _ => Ok(Response::Unknown(UnknownResponse {
            code,
            payload: payload.to_vec(),
        })),
    }
}
