//! Scenario files: a sequence of control operations replayed as data.
//!
//! ```yaml
//! seed: 1
//! steps:
//!   - op: load_topology
//!     file: example.topo
//!   - op: load_noise
//!     file: meyer-heavy.txt
//!   - op: boot_all
//!   - op: add_channel
//!     name: command
//!   - op: run_time
//!     seconds: 30
//!   - op: test_server
//!     node: 3
//!     port: 10
//! ```
//!
//! Topology and noise file names are resolved against the runner's
//! topology and noise directories.

use crate::{ControlError, NetworkController, RunnerError};
use motesim_command::Command;
use motesim_common::{NodeId, SimEngine};
use motesim_model::{NoiseTrace, Topology};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result type alias for scenario operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// A scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Seed for the engine's random draws.
    #[serde(default)]
    pub seed: u64,
    /// Operations in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One control operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Load a topology file.
    LoadTopology { file: PathBuf },
    /// Load a noise trace file.
    LoadNoise { file: PathBuf },
    /// Process a number of engine events.
    Run { events: u64 },
    /// Process a number of nominal seconds of events.
    RunTime { seconds: u64 },
    /// Boot every known node.
    BootAll,
    /// Boot one node.
    BootNode { node: NodeId },
    /// Power a node on.
    PowerOn { node: NodeId },
    /// Power a node off.
    PowerOff { node: NodeId },
    /// Enable a diagnostic channel.
    AddChannel { name: String },
    /// Ask `source` to ping `dest`.
    Ping {
        source: NodeId,
        dest: NodeId,
        message: u32,
    },
    /// Neighbor table dump.
    NeighborDump { node: NodeId },
    /// Link-state table dump.
    LinkstateDump { node: NodeId },
    /// Routing table dump.
    RouteDump { node: NodeId },
    /// Open a test server.
    TestServer { node: NodeId, port: u32 },
    /// Open a test client.
    TestClient {
        node: NodeId,
        dest: NodeId,
        src_port: u32,
        dest_port: u32,
        transfer: u32,
    },
    /// Close a test client.
    CloseClient {
        node: NodeId,
        dest: NodeId,
        src_port: u32,
        dest_port: u32,
    },
}

impl Step {
    /// Whether the step can only run after the topology is loaded.
    pub fn needs_topology(&self) -> bool {
        !matches!(
            self,
            Step::LoadTopology { .. }
                | Step::Run { .. }
                | Step::RunTime { .. }
                | Step::AddChannel { .. }
        )
    }

    /// Build the command this step sends, if it is a command step.
    ///
    /// Field range errors surface here, before anything runs.
    pub fn command(&self) -> Option<Result<(NodeId, Command), ControlError>> {
        let built = match self {
            Step::Ping {
                source,
                dest,
                message,
            } => Command::ping(dest.get(), *message).map(|c| (*source, c)),
            Step::NeighborDump { node } => Ok((*node, Command::NeighborDump)),
            Step::LinkstateDump { node } => Ok((*node, Command::LinkStateDump)),
            Step::RouteDump { node } => Ok((*node, Command::RouteDump)),
            Step::TestServer { node, port } => Command::test_server(*port).map(|c| (*node, c)),
            Step::TestClient {
                node,
                dest,
                src_port,
                dest_port,
                transfer,
            } => Command::test_client(dest.get(), *src_port, *dest_port, *transfer)
                .map(|c| (*node, c)),
            Step::CloseClient {
                node,
                dest,
                src_port,
                dest_port,
            } => Command::close_client(dest.get(), *src_port, *dest_port).map(|c| (*node, c)),
            _ => return None,
        };
        Some(built.map_err(ControlError::from))
    }
}

impl Scenario {
    /// Load a scenario, choosing JSON or YAML by file extension.
    pub fn from_path(path: &Path) -> RunnerResult<Scenario> {
        let text = read_file(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Scenario::from_json_str(&text),
            _ => Scenario::from_yaml_str(&text),
        }
    }

    /// Parse a YAML scenario.
    pub fn from_yaml_str(text: &str) -> RunnerResult<Scenario> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a JSON scenario.
    pub fn from_json_str(text: &str) -> RunnerResult<Scenario> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Summary of a scenario run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Steps that completed.
    pub steps_executed: u64,
    /// Steps that failed validation and were skipped.
    pub steps_failed: u64,
    /// Command packets handed to the engine.
    pub commands_dispatched: u64,
    /// Engine events processed.
    pub events_processed: u64,
    /// Engine time at the end of the run, in ticks.
    pub final_time_ticks: u64,
}

/// Replays scenarios against a controller.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    /// Directory topology files are resolved against.
    pub topo_dir: PathBuf,
    /// Directory noise files are resolved against.
    pub noise_dir: PathBuf,
    /// Log and skip steps that fail validation instead of stopping.
    pub keep_going: bool,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        ScenarioRunner {
            topo_dir: PathBuf::from("topo"),
            noise_dir: PathBuf::from("noise"),
            keep_going: false,
        }
    }
}

impl ScenarioRunner {
    /// Run every step of `scenario` against `controller`.
    pub fn run<E: SimEngine>(
        &self,
        scenario: &Scenario,
        controller: &mut NetworkController<E>,
    ) -> RunnerResult<RunReport> {
        let mut report = RunReport::default();

        for (index, step) in scenario.steps.iter().enumerate() {
            match self.apply(step, controller, &mut report) {
                Ok(()) => report.steps_executed += 1,
                Err(RunnerError::Control(err)) if self.keep_going => {
                    warn!(step = index, error = %err, "step failed, continuing");
                    report.steps_failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        report.events_processed = controller.clock().events_processed();
        report.final_time_ticks = controller.current_time().as_ticks();
        info!(
            steps = report.steps_executed,
            failed = report.steps_failed,
            commands = report.commands_dispatched,
            events = report.events_processed,
            "scenario complete"
        );
        Ok(report)
    }

    /// Validate a scenario without running it: parse every referenced file,
    /// range-check every command field and make sure nothing needs the
    /// topology before it is loaded.
    pub fn check(&self, scenario: &Scenario) -> RunnerResult<()> {
        let mut topology_loads = 0;
        for (index, step) in scenario.steps.iter().enumerate() {
            if topology_loads == 0 && step.needs_topology() {
                return Err(RunnerError::Scenario(format!(
                    "step {} runs before load_topology",
                    index
                )));
            }
            match step {
                Step::LoadTopology { file } => {
                    topology_loads += 1;
                    let text = read_file(&self.topo_dir.join(file))?;
                    Topology::parse(&text).map_err(ControlError::from)?;
                }
                Step::LoadNoise { file } => {
                    let text = read_file(&self.noise_dir.join(file))?;
                    NoiseTrace::parse(&text).map_err(ControlError::from)?;
                }
                other => {
                    if let Some(built) = other.command() {
                        built?;
                    }
                }
            }
        }
        if topology_loads != 1 {
            return Err(RunnerError::Scenario(format!(
                "expected exactly one load_topology step, found {}",
                topology_loads
            )));
        }
        Ok(())
    }

    fn apply<E: SimEngine>(
        &self,
        step: &Step,
        ctl: &mut NetworkController<E>,
        report: &mut RunReport,
    ) -> RunnerResult<()> {
        if let Some(built) = step.command() {
            let (node, command) = built?;
            ctl.dispatch(node, &command)?;
            report.commands_dispatched += 1;
            return Ok(());
        }

        match step {
            Step::LoadTopology { file } => {
                let text = read_file(&self.topo_dir.join(file))?;
                ctl.load_topology(&text)?;
            }
            Step::LoadNoise { file } => {
                let text = read_file(&self.noise_dir.join(file))?;
                ctl.load_noise(&text)?;
            }
            Step::Run { events } => {
                ctl.advance(*events);
            }
            Step::RunTime { seconds } => {
                ctl.advance_approx(*seconds);
            }
            Step::BootAll => {
                ctl.boot_all()?;
            }
            Step::BootNode { node } => {
                ctl.boot_node(*node)?;
            }
            Step::PowerOn { node } => ctl.power_on(*node)?,
            Step::PowerOff { node } => ctl.power_off(*node)?,
            Step::AddChannel { name } => {
                ctl.enable_channel(name);
            }
            _ => {}
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> RunnerResult<String> {
    std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
