//! The reference engine.

use crate::event::{EventKind, ScheduledEvent};
use motesim_common::{Channel, NodeId, OutboundPacket, SimEngine, SimError, SimResult, SimTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::fmt;
use tracing::{debug, info, trace};

// ============================================================================
// Node State
// ============================================================================

/// A finalized noise model: the trace the node samples its noise floor from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseModel {
    readings: Vec<i32>,
}

impl NoiseModel {
    /// Readings the model was built from, in trace order.
    pub fn readings(&self) -> &[i32] {
        &self.readings
    }

    /// Draw a noise-floor reading.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> i32 {
        self.readings[rng.gen_range(0..self.readings.len())]
    }
}

/// A packet that reached a node's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredPacket {
    /// Time the delivery event fired.
    pub time: SimTime,
    /// The packet as handed to the engine.
    pub packet: OutboundPacket,
    /// Noise floor sampled at delivery, if the node has a noise model.
    pub noise_floor: Option<i32>,
}

#[derive(Debug, Default)]
struct Mote {
    booted: bool,
    powered: bool,
    pending_noise: Vec<i32>,
    noise_model: Option<NoiseModel>,
    inbox: Vec<DeliveredPacket>,
}

/// Counters kept by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Events fired.
    pub events_processed: u64,
    /// Boot events fired.
    pub boots: u64,
    /// Packets placed in an inbox.
    pub packets_delivered: u64,
    /// Packets dropped because the node was down.
    pub packets_dropped: u64,
}

// ============================================================================
// Reference Engine
// ============================================================================

/// Deterministic single-threaded engine.
pub struct ReferenceEngine {
    now: SimTime,
    queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
    motes: BTreeMap<NodeId, Mote>,
    links: BTreeMap<(NodeId, NodeId), f64>,
    channels: BTreeSet<String>,
    rng: ChaCha8Rng,
    stats: EngineStats,
}

impl ReferenceEngine {
    /// Create an engine whose random draws derive from `seed`.
    pub fn new(seed: u64) -> Self {
        ReferenceEngine {
            now: SimTime::ZERO,
            queue: BinaryHeap::new(),
            next_seq: 0,
            motes: BTreeMap::new(),
            links: BTreeMap::new(),
            channels: BTreeSet::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            stats: EngineStats::default(),
        }
    }

    /// Register a node without a link.
    pub fn add_node(&mut self, node: NodeId) {
        self.motes.entry(node).or_default();
    }

    /// Known nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.motes.keys().copied()
    }

    /// Gain of the directed link, if registered.
    pub fn link_gain(&self, source: NodeId, destination: NodeId) -> Option<f64> {
        self.links.get(&(source, destination)).copied()
    }

    /// Number of distinct directed links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Check whether a node has booted.
    pub fn is_booted(&self, node: NodeId) -> bool {
        self.motes.get(&node).map(|m| m.booted).unwrap_or(false)
    }

    /// Check whether a node is powered.
    pub fn is_powered(&self, node: NodeId) -> bool {
        self.motes.get(&node).map(|m| m.powered).unwrap_or(false)
    }

    /// Finalized noise model of a node.
    pub fn noise_model(&self, node: NodeId) -> Option<&NoiseModel> {
        self.motes.get(&node).and_then(|m| m.noise_model.as_ref())
    }

    /// Packets delivered to a node, in delivery order.
    pub fn inbox(&self, node: NodeId) -> &[DeliveredPacket] {
        self.motes
            .get(&node)
            .map(|m| m.inbox.as_slice())
            .unwrap_or(&[])
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next queued event.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|e| e.time)
    }

    /// Check whether a diagnostic channel is enabled.
    pub fn channel_enabled(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    /// Engine counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    fn mote_mut(&mut self, node: NodeId) -> SimResult<&mut Mote> {
        self.motes.get_mut(&node).ok_or(SimError::NodeNotFound(node))
    }

    fn schedule(&mut self, time: SimTime, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { time, seq, kind });
    }

    fn channel_log(&self, channel: Channel, node: NodeId, message: fmt::Arguments<'_>) {
        if self.channels.contains(channel.as_str()) {
            info!(
                channel = channel.as_str(),
                node = node.get(),
                time = self.now.as_ticks(),
                "{}",
                message
            );
        }
    }

    fn fire(&mut self, kind: EventKind) {
        match kind {
            EventKind::Boot(node) => {
                if let Some(mote) = self.motes.get_mut(&node) {
                    mote.booted = true;
                    mote.powered = true;
                    self.stats.boots += 1;
                    self.channel_log(Channel::General, node, format_args!("booted"));
                }
            }
            EventKind::Deliver { node, packet } => {
                let now = self.now;
                let Some(mote) = self.motes.get_mut(&node) else {
                    return;
                };
                if !(mote.booted && mote.powered) {
                    self.stats.packets_dropped += 1;
                    self.channel_log(
                        Channel::General,
                        node,
                        format_args!("dropped packet, node is down"),
                    );
                    return;
                }

                let noise_floor = mote
                    .noise_model
                    .as_ref()
                    .map(|model| model.sample(&mut self.rng));
                let len = packet.data.len();
                mote.inbox.push(DeliveredPacket {
                    time: now,
                    packet,
                    noise_floor,
                });
                self.stats.packets_delivered += 1;
                self.channel_log(
                    Channel::Command,
                    node,
                    format_args!("packet received, {} bytes", len),
                );
            }
        }
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SimEngine for ReferenceEngine {
    fn time(&self) -> SimTime {
        self.now
    }

    fn run_next_event(&mut self) -> bool {
        let Some(event) = self.queue.pop() else {
            return false;
        };
        // Events scheduled in the past fire now; time never moves backwards.
        self.now = self.now.max(event.time);
        self.stats.events_processed += 1;
        trace!(time = self.now.as_ticks(), seq = event.seq, "firing event");
        self.fire(event.kind);
        true
    }

    fn add_link(&mut self, source: NodeId, destination: NodeId, gain: f64) {
        self.add_node(source);
        self.add_node(destination);
        self.links.insert((source, destination), gain);
    }

    fn boot_at(&mut self, node: NodeId, time: SimTime) -> SimResult<()> {
        self.mote_mut(node)?;
        self.schedule(time, EventKind::Boot(node));
        debug!(node = node.get(), time = time.as_ticks(), "boot scheduled");
        Ok(())
    }

    fn turn_on(&mut self, node: NodeId) -> SimResult<()> {
        self.mote_mut(node)?.powered = true;
        self.channel_log(Channel::General, node, format_args!("powered on"));
        Ok(())
    }

    fn turn_off(&mut self, node: NodeId) -> SimResult<()> {
        self.mote_mut(node)?.powered = false;
        self.channel_log(Channel::General, node, format_args!("powered off"));
        Ok(())
    }

    fn add_noise_trace_reading(&mut self, node: NodeId, reading: i32) -> SimResult<()> {
        self.mote_mut(node)?.pending_noise.push(reading);
        Ok(())
    }

    fn create_noise_model(&mut self, node: NodeId) -> SimResult<()> {
        let mote = self.mote_mut(node)?;
        if mote.pending_noise.is_empty() {
            return Err(SimError::EmptyNoiseTrace(node));
        }
        let readings = std::mem::take(&mut mote.pending_noise);
        debug!(node = node.get(), readings = readings.len(), "noise model created");
        mote.noise_model = Some(NoiseModel { readings });
        Ok(())
    }

    fn deliver(&mut self, node: NodeId, packet: OutboundPacket, time: SimTime) -> SimResult<()> {
        self.mote_mut(node)?;
        self.schedule(time, EventKind::Deliver { node, packet });
        Ok(())
    }

    fn add_channel(&mut self, name: &str) {
        if self.channels.insert(name.to_string()) {
            debug!(channel = name, "channel enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn packet(dest: u32, data: &[u8]) -> OutboundPacket {
        OutboundPacket::new(99, n(dest), data.to_vec())
    }

    fn run_all(engine: &mut ReferenceEngine) {
        while engine.run_next_event() {}
    }

    #[test]
    fn test_links_register_nodes_and_last_wins() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        engine.add_link(n(1), n(2), -70.0);
        assert_eq!(engine.nodes().collect::<Vec<_>>(), vec![n(1), n(2)]);
        assert_eq!(engine.link_gain(n(1), n(2)), Some(-70.0));
        assert_eq!(engine.link_gain(n(2), n(1)), None);
        assert_eq!(engine.link_count(), 1);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut engine = ReferenceEngine::new(1);
        assert_eq!(
            engine.boot_at(n(9), SimTime::ZERO),
            Err(SimError::NodeNotFound(n(9)))
        );
        assert_eq!(engine.turn_off(n(9)), Err(SimError::NodeNotFound(n(9))));
        assert_eq!(
            engine.deliver(n(9), packet(9, &[0]), SimTime::ZERO),
            Err(SimError::NodeNotFound(n(9)))
        );
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn test_boot_advances_time() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(2), n(3), 0.9);
        engine.boot_at(n(3), SimTime::from_ticks(3999)).unwrap();
        engine.boot_at(n(2), SimTime::from_ticks(2666)).unwrap();

        assert!(engine.run_next_event());
        assert_eq!(engine.time(), SimTime::from_ticks(2666));
        assert!(engine.is_booted(n(2)));
        assert!(!engine.is_booted(n(3)));

        assert!(engine.run_next_event());
        assert_eq!(engine.time(), SimTime::from_ticks(3999));
        assert!(!engine.run_next_event());
        assert_eq!(engine.stats().boots, 2);
    }

    #[test]
    fn test_delivery_lands_in_inbox() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        engine.boot_at(n(2), SimTime::ZERO).unwrap();
        engine.deliver(n(2), packet(2, &[5, 10]), SimTime::from_ticks(5)).unwrap();
        run_all(&mut engine);

        let inbox = engine.inbox(n(2));
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].time, SimTime::from_ticks(5));
        assert_eq!(inbox[0].packet.data, vec![5, 10]);
        assert_eq!(inbox[0].noise_floor, None);
    }

    #[test]
    fn test_delivery_to_down_node_dropped() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        engine.deliver(n(2), packet(2, &[0]), SimTime::from_ticks(5)).unwrap();
        run_all(&mut engine);
        assert!(engine.inbox(n(2)).is_empty());
        assert_eq!(engine.stats().packets_dropped, 1);

        engine.boot_at(n(2), SimTime::from_ticks(10)).unwrap();
        run_all(&mut engine);
        engine.turn_off(n(2)).unwrap();
        engine.deliver(n(2), packet(2, &[0]), SimTime::from_ticks(20)).unwrap();
        run_all(&mut engine);
        assert!(engine.inbox(n(2)).is_empty());
        assert_eq!(engine.stats().packets_dropped, 2);

        engine.turn_on(n(2)).unwrap();
        engine.deliver(n(2), packet(2, &[0]), SimTime::from_ticks(30)).unwrap();
        run_all(&mut engine);
        assert_eq!(engine.inbox(n(2)).len(), 1);
    }

    #[test]
    fn test_same_time_events_fire_in_schedule_order() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        engine.boot_at(n(2), SimTime::ZERO).unwrap();
        for i in 0..5u8 {
            engine.deliver(n(2), packet(2, &[i]), SimTime::from_ticks(7)).unwrap();
        }
        run_all(&mut engine);
        let order: Vec<u8> = engine.inbox(n(2)).iter().map(|d| d.packet.data[0]).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_past_event_does_not_rewind_time() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        engine.boot_at(n(1), SimTime::from_ticks(100)).unwrap();
        run_all(&mut engine);
        engine.boot_at(n(2), SimTime::from_ticks(10)).unwrap();
        run_all(&mut engine);
        assert_eq!(engine.time(), SimTime::from_ticks(100));
    }

    #[test]
    fn test_noise_model_requires_readings() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_link(n(1), n(2), -50.0);
        assert_eq!(
            engine.create_noise_model(n(1)),
            Err(SimError::EmptyNoiseTrace(n(1)))
        );
        for reading in [-98, -97, -41] {
            engine.add_noise_trace_reading(n(1), reading).unwrap();
        }
        engine.create_noise_model(n(1)).unwrap();
        assert_eq!(engine.noise_model(n(1)).unwrap().readings(), &[-98, -97, -41]);
    }

    #[test]
    fn test_noise_samples_replay_with_same_seed() {
        fn run(seed: u64) -> Vec<Option<i32>> {
            let mut engine = ReferenceEngine::new(seed);
            engine.add_link(n(1), n(2), -50.0);
            for reading in [-98, -97, -96, -95, -41, -39] {
                engine.add_noise_trace_reading(n(2), reading).unwrap();
            }
            engine.create_noise_model(n(2)).unwrap();
            engine.boot_at(n(2), SimTime::ZERO).unwrap();
            for t in 1..=20 {
                engine.deliver(n(2), packet(2, &[0]), SimTime::from_ticks(t)).unwrap();
            }
            while engine.run_next_event() {}
            engine.inbox(n(2)).iter().map(|d| d.noise_floor).collect()
        }

        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first.iter().all(|f| f.is_some()));
    }

    #[test]
    fn test_channels_idempotent() {
        let mut engine = ReferenceEngine::new(1);
        engine.add_channel("command");
        engine.add_channel("command");
        assert!(engine.channel_enabled("command"));
        assert!(!engine.channel_enabled("general"));
    }
}
