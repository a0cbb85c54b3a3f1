//! Mote Command Packets
//!
//! This crate provides types for building the command packets the control
//! plane injects into simulated motes, and for decoding them again on the
//! receiving side.
//!
//! # Wire Format
//!
//! A command packet is a one-byte kind header followed directly by a
//! kind-specific payload. There is no length prefix and no checksum; the
//! firmware knows the shape of each kind:
//!
//! | Kind             | Value | Payload                                   |
//! |------------------|-------|-------------------------------------------|
//! | `PING`           | 0     | `[dest, message]`                         |
//! | `NEIGHBOR_DUMP`  | 1     | ASCII text                                |
//! | `LINKSTATE_DUMP` | 2     | ASCII text                                |
//! | `ROUTE_DUMP`     | 3     | ASCII text                                |
//! | `TEST_CLIENT`    | 4     | `[dest, src_port, dest_port, transfer]`   |
//! | `TEST_SERVER`    | 5     | `[port]`                                  |
//! | `CLOSE_CLIENT`   | 6     | `[dest, src_port, dest_port]`             |
//!
//! Every payload field is a single byte. Values that do not fit are
//! rejected with [`CommandError::FieldOverflow`], never truncated.
//!
//! # Example
//!
//! ```rust
//! use motesim_command::{Command, CommandPacket};
//! use motesim_common::NodeId;
//!
//! let cmd = Command::test_server(10).unwrap();
//! let packet = CommandPacket::new(NodeId::new(3), &cmd);
//! assert_eq!(packet.encode().unwrap(), vec![5, 10]);
//! ```

mod codec;
mod commands;
mod error;

pub use codec::*;
pub use commands::*;
pub use error::*;
