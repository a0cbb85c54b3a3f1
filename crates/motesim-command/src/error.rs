//! Error types for command packets.

use crate::CommandKind;
use thiserror::Error;

/// Errors that can occur when building or decoding command packets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A payload field does not fit its one-byte slot.
    #[error("field overflow: {field} = {value} exceeds {max}")]
    FieldOverflow {
        /// Name of the field.
        field: &'static str,
        /// Value supplied by the caller.
        value: u64,
        /// Largest value the field can carry.
        max: u64,
    },

    /// The encoded packet would not fit the radio's data length.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Encoded size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The header byte is not a known command kind.
    #[error("unknown command kind: {0}")]
    UnknownKind(u8),

    /// The payload length does not match the shape of its kind.
    #[error("{kind} payload must be {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Kind named in the header.
        kind: CommandKind,
        /// Length the kind requires.
        expected: usize,
        /// Length actually present.
        actual: usize,
    },

    /// The packet has no header byte.
    #[error("empty packet")]
    EmptyPacket,
}

/// Result type alias for command operations.
pub type CommandResult<T> = Result<T, CommandError>;
