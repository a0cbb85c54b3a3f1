//! # motesim-runner library
//!
//! The control plane for a simulated mote network.
//!
//! [`NetworkController`] is the single orchestration point: it loads the
//! topology and noise descriptions into the engine, schedules boots,
//! forwards power toggles and injects command packets a fixed lead after
//! the current engine time. [`ScenarioRunner`] replays a scenario file of
//! such operations against a controller.
//!
//! The engine is injected, so the same controller drives the in-process
//! [`ReferenceEngine`] or a recording stub in tests.

mod controller;
pub mod scenario;

pub use controller::{
    ControllerState, NetworkController, BOOT_SPACING_TICKS, DISPATCH_LEAD_TICKS,
};
pub use motesim_common::{Channel, NodeId, SimEngine, SimTime};
pub use motesim_engine::ReferenceEngine;
pub use scenario::{RunReport, RunnerResult, Scenario, ScenarioRunner, Step};

use motesim_command::CommandError;
use motesim_common::SimError;
use motesim_model::ModelError;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Validation failures surfaced by [`NetworkController`].
///
/// All of them are detected before any engine call, so the controller stays
/// usable after one is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Topology or noise description could not be parsed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A command could not be encoded.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The operation needs a loaded topology.
    #[error("no topology loaded")]
    NoTopologyLoaded,

    /// The description was already loaded for this run.
    #[error("{0} already loaded; reloading is not supported")]
    ReloadNotSupported(&'static str),

    /// Command addressed to a node outside the topology.
    #[error("unknown destination node {0}")]
    UnknownDestination(NodeId),

    /// Boot or power operation on a node outside the topology.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The engine refused the operation.
    #[error("engine error: {0}")]
    Engine(#[from] SimError),
}

impl ControlError {
    /// Short label for the `reason` metric label.
    pub fn reason_label(&self) -> &'static str {
        match self {
            ControlError::Model(ModelError::MalformedTopology { .. }) => "malformed_topology",
            ControlError::Model(_) => "malformed_noise",
            ControlError::Command(CommandError::FieldOverflow { .. }) => "field_overflow",
            ControlError::Command(_) => "bad_command",
            ControlError::NoTopologyLoaded => "no_topology",
            ControlError::ReloadNotSupported(_) => "reload",
            ControlError::UnknownDestination(_) => "unknown_destination",
            ControlError::UnknownNode(_) => "unknown_node",
            ControlError::Engine(_) => "engine",
        }
    }
}

/// Result type alias for controller operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while running a scenario.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Controller error.
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// IO error.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File being read.
        path: std::path::PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scenario configuration error.
    #[error("Scenario error: {0}")]
    Scenario(String),
}
