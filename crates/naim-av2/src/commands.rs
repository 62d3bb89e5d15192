//! AV2 command encoder.
//!
//! Each command is a single opcode byte; volume additionally carries a
//! one-byte level. The functions here produce and consume that body only.
//! The `*AV2 ` header, terminator and separately timed preamble byte are added
//! by the [`sender`](crate::sender), because envelope construction is tied to
//! transmission timing.

use naim_core::error::{Error, Result};

use crate::response::{Input, MAX_VOLUME};

const OP_ON: u8 = 0x21;
const OP_STANDBY: u8 = 0x22;
/// Followed by the level byte, 0-99.
const OP_VOLUME: u8 = 0x23;
const OP_MUTE_ON: u8 = 0x24;
const OP_MUTE_OFF: u8 = 0x25;
const OP_INPUT_VIP1: u8 = 0x2F;
const OP_INPUT_VIP2: u8 = 0x30;
const OP_INPUT_OP1: u8 = 0x35;
const OP_INPUT_OP2: u8 = 0x36;
const OP_STATUS_QUERY: u8 = 0x69;

/// A command the amplifier understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Standby,
    MuteOn,
    MuteOff,
    InputVip1,
    InputVip2,
    InputOp1,
    InputOp2,
    StatusQuery,
    /// Set the volume level. Levels above 99 are rejected by [`encode_command`].
    Volume(u8),
}

impl Command {
    /// Build a volume command, rejecting levels outside 0-99.
    pub fn volume(level: i32) -> Result<Self> {
        match u8::try_from(level) {
            Ok(level) if level <= MAX_VOLUME => Ok(Command::Volume(level)),
            _ => Err(Error::VolumeOutOfRange(level)),
        }
    }

    /// Build the input-select command for `input`.
    pub fn select_input(input: Input) -> Result<Self> {
        match input {
            Input::Vip1 => Ok(Command::InputVip1),
            Input::Vip2 => Ok(Command::InputVip2),
            Input::Op1 => Ok(Command::InputOp1),
            Input::Op2 => Ok(Command::InputOp2),
            Input::Unknown => Err(Error::InvalidParameter(format!("unknown input {input}"))),
        }
    }

    /// The opcode byte.
    pub const fn opcode(self) -> u8 {
        match self {
            Command::On => OP_ON,
            Command::Standby => OP_STANDBY,
            Command::MuteOn => OP_MUTE_ON,
            Command::MuteOff => OP_MUTE_OFF,
            Command::InputVip1 => OP_INPUT_VIP1,
            Command::InputVip2 => OP_INPUT_VIP2,
            Command::InputOp1 => OP_INPUT_OP1,
            Command::InputOp2 => OP_INPUT_OP2,
            Command::StatusQuery => OP_STATUS_QUERY,
            Command::Volume(_) => OP_VOLUME,
        }
    }
}

/// Encode a command into its opcode byte plus optional argument.
///
/// # Example
///
/// ```
/// use naim_av2::commands::{encode_command, Command};
///
/// assert_eq!(encode_command(Command::MuteOn).unwrap(), vec![0x24]);
/// assert_eq!(encode_command(Command::Volume(50)).unwrap(), vec![0x23, 0x32]);
/// ```
pub fn encode_command(command: Command) -> Result<Vec<u8>> {
    match command {
        Command::Volume(level) if level > MAX_VOLUME => {
            Err(Error::VolumeOutOfRange(i32::from(level)))
        }
        Command::Volume(level) => Ok(vec![OP_VOLUME, level]),
        other => Ok(vec![other.opcode()]),
    }
}

/// Parse an encoded command body back into a [`Command`].
pub fn decode_command(body: &[u8]) -> Result<Command> {
    let (&opcode, rest) = body
        .split_first()
        .ok_or_else(|| Error::InvalidParameter("empty command body".into()))?;

    let command = match opcode {
        OP_VOLUME => {
            return match rest {
                [level] => Command::volume(i32::from(*level)),
                _ => Err(Error::InvalidParameter(format!(
                    "volume command needs one argument byte, got {}",
                    rest.len()
                ))),
            };
        }
        OP_ON => Command::On,
        OP_STANDBY => Command::Standby,
        OP_MUTE_ON => Command::MuteOn,
        OP_MUTE_OFF => Command::MuteOff,
        OP_INPUT_VIP1 => Command::InputVip1,
        OP_INPUT_VIP2 => Command::InputVip2,
        OP_INPUT_OP1 => Command::InputOp1,
        OP_INPUT_OP2 => Command::InputOp2,
        OP_STATUS_QUERY => Command::StatusQuery,
        other => {
            return Err(Error::InvalidParameter(format!(
                "unknown opcode 0x{other:02X}"
            )));
        }
    };

    if !rest.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "opcode 0x{opcode:02X} takes no argument, got {} bytes",
            rest.len()
        )));
    }
    Ok(command)
}
