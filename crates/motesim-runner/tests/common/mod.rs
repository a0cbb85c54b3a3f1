//! Shared helpers for controller integration tests.

#![allow(dead_code)]

use motesim_common::{NodeId, OutboundPacket, SimEngine, SimError, SimResult, SimTime};
use motesim_metrics::metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One call made on the engine boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AddLink(NodeId, NodeId, f64),
    BootAt(NodeId, SimTime),
    TurnOn(NodeId),
    TurnOff(NodeId),
    AddNoiseReading(NodeId, i32),
    CreateNoiseModel(NodeId),
    Deliver(NodeId, OutboundPacket, SimTime),
    AddChannel(String),
}

/// Engine stub that records every mutating call.
///
/// Each `run_next_event` pops the earliest scheduled time (boots and
/// deliveries) and moves the clock there; with nothing scheduled it
/// reports an empty queue. Calls naming `failing` are refused with
/// `NodeNotFound` and not recorded.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    pub now: u64,
    pub failing: Option<NodeId>,
    scheduled: VecDeque<u64>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `now` ticks.
    pub fn at(now: u64) -> Self {
        RecordingEngine {
            now,
            ..Self::default()
        }
    }

    /// Refuse every per-node call for `node`.
    pub fn failing_on(node: NodeId) -> Self {
        RecordingEngine {
            failing: Some(node),
            ..Self::default()
        }
    }

    fn check(&self, node: NodeId) -> SimResult<()> {
        if self.failing == Some(node) {
            return Err(SimError::NodeNotFound(node));
        }
        Ok(())
    }

    pub fn deliveries(&self) -> Vec<(NodeId, OutboundPacket, SimTime)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Deliver(node, packet, time) => Some((*node, packet.clone(), *time)),
                _ => None,
            })
            .collect()
    }

    pub fn boots(&self) -> Vec<(NodeId, SimTime)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::BootAt(node, time) => Some((*node, *time)),
                _ => None,
            })
            .collect()
    }

    fn schedule(&mut self, time: SimTime) {
        let ticks = time.as_ticks();
        let pos = self.scheduled.partition_point(|&t| t <= ticks);
        self.scheduled.insert(pos, ticks);
    }
}

impl SimEngine for RecordingEngine {
    fn time(&self) -> SimTime {
        SimTime::from_ticks(self.now)
    }

    fn run_next_event(&mut self) -> bool {
        match self.scheduled.pop_front() {
            Some(t) => {
                self.now = self.now.max(t);
                true
            }
            None => false,
        }
    }

    fn add_link(&mut self, source: NodeId, destination: NodeId, gain: f64) {
        self.calls.push(EngineCall::AddLink(source, destination, gain));
    }

    fn boot_at(&mut self, node: NodeId, time: SimTime) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::BootAt(node, time));
        self.schedule(time);
        Ok(())
    }

    fn turn_on(&mut self, node: NodeId) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::TurnOn(node));
        Ok(())
    }

    fn turn_off(&mut self, node: NodeId) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::TurnOff(node));
        Ok(())
    }

    fn add_noise_trace_reading(&mut self, node: NodeId, reading: i32) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::AddNoiseReading(node, reading));
        Ok(())
    }

    fn create_noise_model(&mut self, node: NodeId) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::CreateNoiseModel(node));
        Ok(())
    }

    fn deliver(&mut self, node: NodeId, packet: OutboundPacket, time: SimTime) -> SimResult<()> {
        self.check(node)?;
        self.calls.push(EngineCall::Deliver(node, packet, time));
        self.schedule(time);
        Ok(())
    }

    fn add_channel(&mut self, name: &str) {
        self.calls.push(EngineCall::AddChannel(name.to_string()));
    }
}

/// Metrics recorder that keeps counter totals keyed by name and labels.
///
/// Install it for one closure with `metrics::with_local_recorder`.
#[derive(Debug, Default)]
pub struct CountingRecorder {
    counters: Mutex<BTreeMap<String, Arc<AtomicU64>>>,
}

impl CountingRecorder {
    /// Total for `name` with exactly the given labels.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = counter_key(name, labels.iter().copied());
        self.counters
            .lock()
            .unwrap()
            .get(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

fn counter_key<'a>(name: &str, labels: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut key = name.to_string();
    for (k, v) in labels {
        key.push_str(&format!(",{}={}", k, v));
    }
    key
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let name = counter_key(key.name(), key.labels().map(|l| (l.key(), l.value())));
        let value = self.counters.lock().unwrap().entry(name).or_default().clone();
        Counter::from_arc(value)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

pub fn n(id: u32) -> NodeId {
    NodeId::new(id)
}
