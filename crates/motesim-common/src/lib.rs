//! # motesim-common
//!
//! Common types and traits shared by the motesim crates.
//!
//! This crate provides:
//! - Time representation ([`SimTime`])
//! - Node identification ([`NodeId`])
//! - Diagnostic channel names ([`Channel`])
//! - The boundary to the simulation engine ([`SimEngine`], [`OutboundPacket`])
//! - The discrete-event clock wrapper ([`SimulationClock`])

mod clock;

pub use clock::{SimulationClock, EVENTS_PER_NOMINAL_SECOND};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported by a simulation engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The engine has no node with this id.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Simulation time overflow.
    #[error("Simulation time overflow")]
    TimeOverflow,

    /// A noise model was requested for a node with no trace readings.
    #[error("Node {0} has an empty noise trace")]
    EmptyNoiseTrace(NodeId),
}

/// Result type alias for engine operations.
pub type SimResult<T> = Result<T, SimError>;

// ============================================================================
// Time Types
// ============================================================================

/// Simulation time in engine ticks since simulation start.
///
/// The engine owns the clock; callers only read it and compute offsets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Zero time.
    pub const ZERO: SimTime = SimTime(0);

    /// Create from raw ticks.
    pub const fn from_ticks(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Get as raw ticks.
    pub const fn as_ticks(&self) -> u64 {
        self.0
    }

    /// Add a tick offset, failing on overflow.
    pub fn checked_add_ticks(&self, ticks: u64) -> Option<SimTime> {
        self.0.checked_add(ticks).map(SimTime)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// Identifier of a simulated mote.
///
/// The set of valid ids in a run is exactly the set seen in the topology.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID.
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Diagnostic Channels
// ============================================================================

/// Named diagnostic channels understood by the engine and firmware.
///
/// The names are opaque tags forwarded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Command reception (`command`)
    Command,
    /// General output (`general`)
    General,
    /// Neighbor discovery (`neighbor`)
    Neighbor,
    /// Flooding (`flooding`)
    Flooding,
    /// Routing (`routing`)
    Routing,
    /// Transport (`transport`)
    Transport,
    /// Hash map debugging (`hashmap`)
    Hashmap,
}

impl Channel {
    /// Every known channel.
    pub const ALL: [Channel; 7] = [
        Channel::Command,
        Channel::General,
        Channel::Neighbor,
        Channel::Flooding,
        Channel::Routing,
        Channel::Transport,
        Channel::Hashmap,
    ];

    /// Get the channel name forwarded to the engine.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Channel::Command => "command",
            Channel::General => "general",
            Channel::Neighbor => "neighbor",
            Channel::Flooding => "flooding",
            Channel::Routing => "routing",
            Channel::Transport => "transport",
            Channel::Hashmap => "hashmap",
        }
    }

    /// Parse a channel from its name.
    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Engine Boundary
// ============================================================================

/// A packet handed to the engine for injection onto the simulated medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Active-message type the receiving firmware dispatches on.
    pub am_type: u8,
    /// Destination field of the packet header.
    pub destination: NodeId,
    /// Packet body.
    pub data: Vec<u8>,
}

impl OutboundPacket {
    /// Create a new outbound packet.
    pub fn new(am_type: u8, destination: NodeId, data: Vec<u8>) -> Self {
        OutboundPacket {
            am_type,
            destination,
            data,
        }
    }
}

/// The discrete-event simulation engine the control plane drives.
///
/// The engine owns time, the event queue, radio propagation and the
/// simulated firmware. Implementations are single-threaded; callers
/// serialize access.
pub trait SimEngine {
    /// Current simulation time.
    fn time(&self) -> SimTime;

    /// Process the next pending event. Returns `false` if the queue is empty.
    fn run_next_event(&mut self) -> bool;

    /// Register a directed link. Later registrations of the same pair win.
    fn add_link(&mut self, source: NodeId, destination: NodeId, gain: f64);

    /// Schedule a node boot at an absolute time.
    fn boot_at(&mut self, node: NodeId, time: SimTime) -> SimResult<()>;

    /// Power a node on at the current time.
    fn turn_on(&mut self, node: NodeId) -> SimResult<()>;

    /// Power a node off at the current time.
    fn turn_off(&mut self, node: NodeId) -> SimResult<()>;

    /// Append one reading to a node's noise trace.
    fn add_noise_trace_reading(&mut self, node: NodeId, reading: i32) -> SimResult<()>;

    /// Finalize a node's noise model from its accumulated trace.
    fn create_noise_model(&mut self, node: NodeId) -> SimResult<()>;

    /// Deliver a packet to `node` at an absolute time.
    fn deliver(&mut self, node: NodeId, packet: OutboundPacket, time: SimTime) -> SimResult<()>;

    /// Enable a named diagnostic channel.
    fn add_channel(&mut self, name: &str);
}
