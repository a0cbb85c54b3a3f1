//! # motesim-engine
//!
//! A small deterministic discrete-event engine implementing
//! [`SimEngine`](motesim_common::SimEngine).
//!
//! It models what the control plane can observe from outside a mote:
//! boot and power state, per-node noise models, registered links, and an
//! inbox of packets injected at a given time. It does not model radio
//! propagation or firmware; injected packets land directly in the
//! destination's inbox when their event fires.
//!
//! Events fire in time order, and events scheduled for the same time fire
//! in the order they were scheduled. All randomness comes from a
//! `ChaCha8Rng` seeded at construction, so identical inputs replay
//! identically.

mod engine;
mod event;

pub use engine::{DeliveredPacket, EngineStats, NoiseModel, ReferenceEngine};
