//! The network controller.

use crate::{ControlError, ControlResult};
use motesim_command::{Command, CommandKind, CommandPacket};
use motesim_common::{NodeId, SimEngine, SimError, SimResult, SimTime, SimulationClock};
use motesim_metrics::{metric_defs, metrics};
use motesim_model::{NoiseTrace, Topology};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Ticks between the boot times of consecutive node ids.
///
/// Node `n` boots at `n * BOOT_SPACING_TICKS`, so nodes never all start
/// transmitting at time zero.
pub const BOOT_SPACING_TICKS: u64 = 1333;

/// Ticks between issuing a command and its delivery.
///
/// Keeps delivery strictly after the moment the command was issued.
pub const DISPATCH_LEAD_TICKS: u64 = 5;

/// Lifecycle of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControllerState {
    /// Nothing loaded yet.
    Uninitialized,
    /// Topology registered with the engine.
    TopologyLoaded,
    /// Noise models created for every node.
    NoiseLoaded,
    /// At least one node boot has been scheduled.
    Running,
}

/// Single orchestration point between a caller and the engine.
///
/// Owns the engine (through its [`SimulationClock`]) and the parsed topology
/// for one run. Every operation validates its inputs before touching the
/// engine.
pub struct NetworkController<E> {
    clock: SimulationClock<E>,
    topology: Option<Topology>,
    noise_loaded: bool,
    noise_attempted: bool,
    state: ControllerState,
    channels: BTreeSet<String>,
}

impl<E: SimEngine> NetworkController<E> {
    /// Create a controller driving `engine`.
    pub fn new(engine: E) -> Self {
        NetworkController {
            clock: SimulationClock::new(engine),
            topology: None,
            noise_loaded: false,
            noise_attempted: false,
            state: ControllerState::Uninitialized,
            channels: BTreeSet::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The loaded topology, if any.
    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Known nodes in first-seen order (empty before a topology is loaded).
    pub fn known_nodes(&self) -> &[NodeId] {
        self.topology.as_ref().map(|t| t.nodes()).unwrap_or(&[])
    }

    /// Whether noise models have been created.
    pub fn noise_loaded(&self) -> bool {
        self.noise_loaded
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimulationClock<E> {
        &self.clock
    }

    /// The engine being driven.
    pub fn engine(&self) -> &E {
        self.clock.engine()
    }

    /// Consume the controller, returning the engine.
    pub fn into_engine(self) -> E {
        self.clock.into_engine()
    }

    /// Current engine time.
    pub fn current_time(&self) -> SimTime {
        self.clock.current_time()
    }

    /// Names of the channels enabled so far.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parse a topology description and register every link with the engine.
    ///
    /// May be called once per run.
    pub fn load_topology(&mut self, description: &str) -> ControlResult<&Topology> {
        if self.topology.is_some() {
            return Err(rejected(ControlError::ReloadNotSupported("topology")));
        }
        let topology = Topology::parse(description).map_err(|e| rejected(e.into()))?;

        let engine = self.clock.engine_mut();
        for link in topology.links() {
            engine.add_link(link.source, link.destination, link.gain);
        }
        info!(
            declared = topology.declared_count(),
            nodes = topology.node_count(),
            links = topology.links().len(),
            "topology loaded"
        );

        self.state = ControllerState::TopologyLoaded;
        Ok(&*self.topology.insert(topology))
    }

    /// Parse a noise trace and apply it to every known node.
    ///
    /// Each reading goes to every node in file order; each node's noise
    /// model is created only after all readings are applied. Returns the
    /// number of readings in the trace.
    ///
    /// Once the trace parses, the load counts as used even if the engine
    /// then fails part way: readings already applied cannot be withdrawn,
    /// so a later call is `ReloadNotSupported`.
    pub fn load_noise(&mut self, description: &str) -> ControlResult<usize> {
        let topology = match self.topology.as_ref() {
            Some(topology) if !topology.nodes().is_empty() => topology,
            _ => return Err(rejected(ControlError::NoTopologyLoaded)),
        };
        if self.noise_attempted {
            return Err(rejected(ControlError::ReloadNotSupported("noise")));
        }
        let trace = NoiseTrace::parse(description).map_err(|e| rejected(e.into()))?;
        self.noise_attempted = true;

        let engine = self.clock.engine_mut();
        for &reading in trace.readings() {
            for &node in topology.nodes() {
                engine_call(engine.add_noise_trace_reading(node, reading))?;
            }
        }
        for &node in topology.nodes() {
            debug!(node = node.get(), "creating noise model");
            engine_call(engine.create_noise_model(node))?;
        }

        let applied = trace.len() as u64 * topology.node_count() as u64;
        metrics::counter!(metric_defs::NOISE_READINGS.name).increment(applied);
        info!(readings = trace.len(), nodes = topology.node_count(), "noise loaded");

        self.noise_loaded = true;
        if self.state == ControllerState::TopologyLoaded {
            self.state = ControllerState::NoiseLoaded;
        }
        Ok(trace.len())
    }

    // ========================================================================
    // Node Lifecycle
    // ========================================================================

    /// Boot time of a node: its id times [`BOOT_SPACING_TICKS`].
    pub fn boot_time(node: NodeId) -> SimTime {
        SimTime::from_ticks(u64::from(node.get()) * BOOT_SPACING_TICKS)
    }

    /// Schedule a node's boot at its spaced boot time.
    pub fn boot_node(&mut self, node: NodeId) -> ControlResult<SimTime> {
        self.require_node(node)?;
        let at = Self::boot_time(node);
        engine_call(self.clock.engine_mut().boot_at(node, at))?;
        metrics::counter!(metric_defs::BOOTS_SCHEDULED.name).increment(1);
        debug!(node = node.get(), at = at.as_ticks(), "boot scheduled");
        self.state = ControllerState::Running;
        Ok(at)
    }

    /// Boot every known node in first-seen order.
    pub fn boot_all(&mut self) -> ControlResult<Vec<(NodeId, SimTime)>> {
        let nodes = self.known_nodes().to_vec();
        if nodes.is_empty() {
            return Err(rejected(ControlError::NoTopologyLoaded));
        }
        nodes
            .into_iter()
            .map(|node| self.boot_node(node).map(|at| (node, at)))
            .collect()
    }

    /// Power a node off now.
    pub fn power_off(&mut self, node: NodeId) -> ControlResult<()> {
        self.require_node(node)?;
        engine_call(self.clock.engine_mut().turn_off(node))?;
        metrics::counter!(metric_defs::POWER_TOGGLES.name, "state" => "off").increment(1);
        debug!(node = node.get(), "powered off");
        Ok(())
    }

    /// Power a node on now.
    pub fn power_on(&mut self, node: NodeId) -> ControlResult<()> {
        self.require_node(node)?;
        engine_call(self.clock.engine_mut().turn_on(node))?;
        metrics::counter!(metric_defs::POWER_TOGGLES.name, "state" => "on").increment(1);
        debug!(node = node.get(), "powered on");
        Ok(())
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Process up to `events` engine events; returns how many ran.
    pub fn advance(&mut self, events: u64) -> u64 {
        let processed = self.clock.advance(events);
        self.record_clock(processed);
        processed
    }

    /// Process `seconds` nominal seconds of events.
    pub fn advance_approx(&mut self, seconds: u64) -> u64 {
        let processed = self.clock.advance_approx(seconds);
        self.record_clock(processed);
        processed
    }

    fn record_clock(&self, processed: u64) {
        metrics::counter!(metric_defs::CLOCK_EVENTS.name).increment(processed);
        metrics::gauge!(metric_defs::SIM_TIME.name).set(self.current_time().as_ticks() as f64);
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Deliver `command` to `destination` at the current time plus
    /// [`DISPATCH_LEAD_TICKS`]. Returns the scheduled delivery time.
    pub fn dispatch(&mut self, destination: NodeId, command: &Command) -> ControlResult<SimTime> {
        self.send(CommandPacket::new(destination, command))
            .map_err(rejected)
    }

    /// Deliver an opaque payload of the given kind.
    ///
    /// Fixed-shape kinds must carry exactly their payload length.
    pub fn dispatch_raw(
        &mut self,
        kind: CommandKind,
        destination: NodeId,
        payload: Vec<u8>,
    ) -> ControlResult<SimTime> {
        let packet = CommandPacket::from_raw(kind, destination, payload);
        packet
            .command()
            .map_err(|e| rejected(e.into()))?;
        self.send(packet).map_err(rejected)
    }

    fn send(&mut self, packet: CommandPacket) -> ControlResult<SimTime> {
        let destination = packet.destination;
        let topology = self.topology.as_ref().ok_or(ControlError::NoTopologyLoaded)?;
        if !topology.contains(destination) {
            return Err(ControlError::UnknownDestination(destination));
        }

        let outbound = packet.to_outbound()?;
        let at = self
            .clock
            .current_time()
            .checked_add_ticks(DISPATCH_LEAD_TICKS)
            .ok_or(SimError::TimeOverflow)?;

        debug!(
            kind = %packet.kind,
            dest = destination.get(),
            at = at.as_ticks(),
            data = %hex::encode(&outbound.data),
            "dispatching command"
        );
        self.clock.engine_mut().deliver(destination, outbound, at)?;
        metrics::counter!(
            metric_defs::COMMANDS_DISPATCHED.name,
            "kind" => packet.kind.as_label()
        )
        .increment(1);
        Ok(at)
    }

    /// Ask `source` to ping `dest` with a single message byte.
    pub fn ping(&mut self, source: NodeId, dest: NodeId, message: u32) -> ControlResult<SimTime> {
        let command = Command::ping(dest.get(), message).map_err(|e| rejected(e.into()))?;
        self.dispatch(source, &command)
    }

    /// Ask `node` to dump its neighbor table.
    pub fn neighbor_dump(&mut self, node: NodeId) -> ControlResult<SimTime> {
        self.dispatch(node, &Command::NeighborDump)
    }

    /// Ask `node` to dump its link-state table.
    pub fn linkstate_dump(&mut self, node: NodeId) -> ControlResult<SimTime> {
        self.dispatch(node, &Command::LinkStateDump)
    }

    /// Ask `node` to dump its routing table.
    pub fn route_dump(&mut self, node: NodeId) -> ControlResult<SimTime> {
        self.dispatch(node, &Command::RouteDump)
    }

    /// Ask `node` to listen on `port`.
    pub fn test_server(&mut self, node: NodeId, port: u32) -> ControlResult<SimTime> {
        let command = Command::test_server(port).map_err(|e| rejected(e.into()))?;
        self.dispatch(node, &command)
    }

    /// Ask `node` to open a connection from `src_port` to `dest:dest_port`
    /// and transfer `transfer` units.
    pub fn test_client(
        &mut self,
        node: NodeId,
        dest: NodeId,
        src_port: u32,
        dest_port: u32,
        transfer: u32,
    ) -> ControlResult<SimTime> {
        let command = Command::test_client(dest.get(), src_port, dest_port, transfer)
            .map_err(|e| rejected(e.into()))?;
        self.dispatch(node, &command)
    }

    /// Ask `node` to close its connection from `src_port` to `dest:dest_port`.
    pub fn close_client(
        &mut self,
        node: NodeId,
        dest: NodeId,
        src_port: u32,
        dest_port: u32,
    ) -> ControlResult<SimTime> {
        let command = Command::close_client(dest.get(), src_port, dest_port)
            .map_err(|e| rejected(e.into()))?;
        self.dispatch(node, &command)
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Enable a diagnostic channel on the engine.
    ///
    /// Returns `false` (and does not call the engine) if it was already enabled.
    pub fn enable_channel(&mut self, name: &str) -> bool {
        if !self.channels.insert(name.to_string()) {
            return false;
        }
        info!(channel = name, "adding channel");
        self.clock.engine_mut().add_channel(name);
        true
    }

    fn require_node(&self, node: NodeId) -> ControlResult<()> {
        let topology = self
            .topology
            .as_ref()
            .ok_or_else(|| rejected(ControlError::NoTopologyLoaded))?;
        if !topology.contains(node) {
            return Err(rejected(ControlError::UnknownNode(node)));
        }
        Ok(())
    }
}

/// Surface an engine failure through the same path as validation failures.
fn engine_call<T>(result: SimResult<T>) -> ControlResult<T> {
    result.map_err(|e| rejected(e.into()))
}

/// Count a validation failure and hand it back.
fn rejected(err: ControlError) -> ControlError {
    metrics::counter!(metric_defs::COMMANDS_REJECTED.name, "reason" => err.reason_label())
        .increment(1);
    debug!(error = %err, "operation rejected");
    err
}
