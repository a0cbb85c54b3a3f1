//! Commands that can be injected into a simulated mote.
//!
//! Each [`Command`] carries already-validated one-byte fields. The
//! constructors take wider integers so range checks happen here, before
//! anything is encoded.

use crate::error::{CommandError, CommandResult};
use std::fmt;

/// Text payload of a neighbor dump command.
pub const NEIGHBOR_DUMP_TEXT: &str = "neighbor command";
/// Text payload of a link-state dump command.
pub const LINKSTATE_DUMP_TEXT: &str = "linkstate command";
/// Text payload of a route dump command.
pub const ROUTE_DUMP_TEXT: &str = "routing command";

/// Command kinds with their stable wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CommandKind {
    /// Ping another node (`0`)
    Ping = 0,
    /// Dump the neighbor table (`1`)
    NeighborDump = 1,
    /// Dump the link-state table (`2`)
    LinkStateDump = 2,
    /// Dump the routing table (`3`)
    RouteDump = 3,
    /// Open a test transport client (`4`)
    TestClient = 4,
    /// Open a test transport server (`5`)
    TestServer = 5,
    /// Close a test transport client (`6`)
    CloseClient = 6,
}

impl CommandKind {
    /// Every command kind, in wire order.
    pub const ALL: [CommandKind; 7] = [
        CommandKind::Ping,
        CommandKind::NeighborDump,
        CommandKind::LinkStateDump,
        CommandKind::RouteDump,
        CommandKind::TestClient,
        CommandKind::TestServer,
        CommandKind::CloseClient,
    ];

    /// Wire value of the kind header.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Look up a kind by its wire value.
    pub fn from_u8(value: u8) -> Option<CommandKind> {
        CommandKind::ALL.get(value as usize).copied()
    }

    /// Payload length for fixed-shape kinds, `None` for text kinds.
    pub const fn fixed_payload_len(self) -> Option<usize> {
        match self {
            CommandKind::Ping => Some(2),
            CommandKind::TestClient => Some(4),
            CommandKind::TestServer => Some(1),
            CommandKind::CloseClient => Some(3),
            CommandKind::NeighborDump | CommandKind::LinkStateDump | CommandKind::RouteDump => {
                None
            }
        }
    }

    /// Lowercase label for metrics and logs.
    pub const fn as_label(self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::NeighborDump => "neighbor_dump",
            CommandKind::LinkStateDump => "linkstate_dump",
            CommandKind::RouteDump => "route_dump",
            CommandKind::TestClient => "test_client",
            CommandKind::TestServer => "test_server",
            CommandKind::CloseClient => "close_client",
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = CommandError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CommandKind::from_u8(value).ok_or(CommandError::UnknownKind(value))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Ping => "PING",
            CommandKind::NeighborDump => "NEIGHBOR_DUMP",
            CommandKind::LinkStateDump => "LINKSTATE_DUMP",
            CommandKind::RouteDump => "ROUTE_DUMP",
            CommandKind::TestClient => "TEST_CLIENT",
            CommandKind::TestServer => "TEST_SERVER",
            CommandKind::CloseClient => "CLOSE_CLIENT",
        };
        f.write_str(name)
    }
}

/// Check that `value` fits a one-byte payload field.
pub fn byte_field(field: &'static str, value: u32) -> CommandResult<u8> {
    u8::try_from(value).map_err(|_| CommandError::FieldOverflow {
        field,
        value: u64::from(value),
        max: u64::from(u8::MAX),
    })
}

/// A typed command with validated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask the receiving node to ping `dest`.
    Ping {
        /// Node to ping.
        dest: u8,
        /// Single message byte carried by the ping.
        message: u8,
    },

    /// Dump the neighbor table.
    NeighborDump,

    /// Dump the link-state table.
    LinkStateDump,

    /// Dump the routing table.
    RouteDump,

    /// Open a client connection and transfer `transfer` units to `dest`.
    TestClient {
        /// Server node.
        dest: u8,
        /// Local port.
        src_port: u8,
        /// Server port.
        dest_port: u8,
        /// Amount of data to transfer.
        transfer: u8,
    },

    /// Listen on `port`.
    TestServer {
        /// Listening port.
        port: u8,
    },

    /// Close a client connection.
    CloseClient {
        /// Server node.
        dest: u8,
        /// Local port.
        src_port: u8,
        /// Server port.
        dest_port: u8,
    },
}

impl Command {
    /// Build a ping command.
    pub fn ping(dest: u32, message: u32) -> CommandResult<Command> {
        Ok(Command::Ping {
            dest: byte_field("dest", dest)?,
            message: byte_field("message", message)?,
        })
    }

    /// Build a test server command.
    pub fn test_server(port: u32) -> CommandResult<Command> {
        Ok(Command::TestServer {
            port: byte_field("port", port)?,
        })
    }

    /// Build a test client command.
    pub fn test_client(
        dest: u32,
        src_port: u32,
        dest_port: u32,
        transfer: u32,
    ) -> CommandResult<Command> {
        Ok(Command::TestClient {
            dest: byte_field("dest", dest)?,
            src_port: byte_field("src_port", src_port)?,
            dest_port: byte_field("dest_port", dest_port)?,
            transfer: byte_field("transfer", transfer)?,
        })
    }

    /// Build a close client command.
    pub fn close_client(dest: u32, src_port: u32, dest_port: u32) -> CommandResult<Command> {
        Ok(Command::CloseClient {
            dest: byte_field("dest", dest)?,
            src_port: byte_field("src_port", src_port)?,
            dest_port: byte_field("dest_port", dest_port)?,
        })
    }

    /// Get the kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Ping { .. } => CommandKind::Ping,
            Command::NeighborDump => CommandKind::NeighborDump,
            Command::LinkStateDump => CommandKind::LinkStateDump,
            Command::RouteDump => CommandKind::RouteDump,
            Command::TestClient { .. } => CommandKind::TestClient,
            Command::TestServer { .. } => CommandKind::TestServer,
            Command::CloseClient { .. } => CommandKind::CloseClient,
        }
    }

    /// Encode the kind-specific payload (without the kind header).
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::Ping { dest, message } => vec![*dest, *message],
            Command::NeighborDump => NEIGHBOR_DUMP_TEXT.as_bytes().to_vec(),
            Command::LinkStateDump => LINKSTATE_DUMP_TEXT.as_bytes().to_vec(),
            Command::RouteDump => ROUTE_DUMP_TEXT.as_bytes().to_vec(),
            Command::TestClient {
                dest,
                src_port,
                dest_port,
                transfer,
            } => vec![*dest, *src_port, *dest_port, *transfer],
            Command::TestServer { port } => vec![*port],
            Command::CloseClient {
                dest,
                src_port,
                dest_port,
            } => vec![*dest, *src_port, *dest_port],
        }
    }

    /// Parse a command from its kind and payload.
    ///
    /// Text kinds accept any payload; the text is diagnostic only.
    pub fn from_parts(kind: CommandKind, payload: &[u8]) -> CommandResult<Command> {
        if let Some(expected) = kind.fixed_payload_len() {
            if payload.len() != expected {
                return Err(CommandError::LengthMismatch {
                    kind,
                    expected,
                    actual: payload.len(),
                });
            }
        }

        Ok(match kind {
            CommandKind::Ping => Command::Ping {
                dest: payload[0],
                message: payload[1],
            },
            CommandKind::NeighborDump => Command::NeighborDump,
            CommandKind::LinkStateDump => Command::LinkStateDump,
            CommandKind::RouteDump => Command::RouteDump,
            CommandKind::TestClient => Command::TestClient {
                dest: payload[0],
                src_port: payload[1],
                dest_port: payload[2],
                transfer: payload[3],
            },
            CommandKind::TestServer => Command::TestServer { port: payload[0] },
            CommandKind::CloseClient => Command::CloseClient {
                dest: payload[0],
                src_port: payload[1],
                dest_port: payload[2],
            },
        })
    }
}
