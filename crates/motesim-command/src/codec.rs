//! Byte-level encoding of command packets.
//!
//! A packet is the kind header byte followed by the payload bytes. The
//! destination travels in the engine's packet envelope, not in the body.

use crate::commands::{Command, CommandKind};
use crate::error::{CommandError, CommandResult};
use bytes::{Buf, BufMut, BytesMut};
use motesim_common::{NodeId, OutboundPacket};

/// Length of the kind header.
pub const COMMAND_HEADER_LEN: usize = 1;

/// Maximum packet body the simulated radio carries.
pub const MAX_PACKET_LEN: usize = 28;

/// Active-message type the firmware registers for command packets.
pub const COMMAND_AM_TYPE: u8 = 99;

/// A command addressed to one node, ready to be serialized.
///
/// Packets are built per dispatch and discarded once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    /// Kind header.
    pub kind: CommandKind,
    /// Node the packet is delivered to.
    pub destination: NodeId,
    /// Kind-specific payload.
    pub payload: Vec<u8>,
}

impl CommandPacket {
    /// Build a packet from a typed command.
    pub fn new(destination: NodeId, command: &Command) -> Self {
        CommandPacket {
            kind: command.kind(),
            destination,
            payload: command.payload(),
        }
    }

    /// Build a packet with an opaque payload.
    pub fn from_raw(kind: CommandKind, destination: NodeId, payload: Vec<u8>) -> Self {
        CommandPacket {
            kind,
            destination,
            payload,
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        COMMAND_HEADER_LEN + self.payload.len()
    }

    /// Serialize to `[kind][payload...]`.
    pub fn encode(&self) -> CommandResult<Vec<u8>> {
        let size = self.encoded_len();
        if size > MAX_PACKET_LEN {
            return Err(CommandError::PayloadTooLarge {
                size,
                max: MAX_PACKET_LEN,
            });
        }

        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(self.kind.as_u8());
        buf.put_slice(&self.payload);
        Ok(buf.to_vec())
    }

    /// Parse a packet body received by `destination`.
    pub fn decode(destination: NodeId, data: &[u8]) -> CommandResult<CommandPacket> {
        let mut buf = data;
        if !buf.has_remaining() {
            return Err(CommandError::EmptyPacket);
        }
        let kind = CommandKind::try_from(buf.get_u8())?;
        Ok(CommandPacket {
            kind,
            destination,
            payload: buf.to_vec(),
        })
    }

    /// Interpret the payload as a typed command.
    pub fn command(&self) -> CommandResult<Command> {
        Command::from_parts(self.kind, &self.payload)
    }

    /// Wrap the encoded packet in the engine's packet envelope.
    pub fn to_outbound(&self) -> CommandResult<OutboundPacket> {
        Ok(OutboundPacket::new(
            COMMAND_AM_TYPE,
            self.destination,
            self.encode()?,
        ))
    }
}
