//! Scenario files replayed end to end against the reference engine.

use motesim_runner::{
    ControlError, NetworkController, NodeId, ReferenceEngine, RunnerError, Scenario,
    ScenarioRunner, Step,
};
use std::path::{Path, PathBuf};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn runner(keep_going: bool) -> ScenarioRunner {
    ScenarioRunner {
        topo_dir: fixtures().join("topo"),
        noise_dir: fixtures().join("noise"),
        keep_going,
    }
}

fn scenario(name: &str) -> Scenario {
    Scenario::from_path(&fixtures().join("scenarios").join(name)).unwrap()
}

#[test]
fn test_transport_scenario_runs() {
    let scenario = scenario("transport.yaml");
    runner(false).check(&scenario).unwrap();

    let mut ctl = NetworkController::new(ReferenceEngine::new(scenario.seed));
    let report = runner(false).run(&scenario, &mut ctl).unwrap();

    assert_eq!(report.steps_executed, scenario.steps.len() as u64);
    assert_eq!(report.steps_failed, 0);
    assert_eq!(report.commands_dispatched, 3);
    assert_eq!(ctl.known_nodes().len(), 9);
    assert!(ctl.noise_loaded());

    let engine = ctl.into_engine();
    assert_eq!(engine.stats().boots, 9);

    let server_inbox = engine.inbox(NodeId::new(3));
    assert_eq!(server_inbox.len(), 1);
    assert_eq!(server_inbox[0].packet.data, vec![5, 10]);
    assert!(server_inbox[0].noise_floor.is_some());

    let client_inbox = engine.inbox(NodeId::new(2));
    assert_eq!(client_inbox.len(), 2);
    assert_eq!(client_inbox[0].packet.data, vec![4, 3, 20, 10, 150]);
    assert_eq!(client_inbox[1].packet.data, vec![6, 3, 20, 10]);
    assert!(client_inbox[0].time > server_inbox[0].time);
}

#[test]
fn test_transport_scenario_reproducible() {
    let scenario = scenario("transport.yaml");
    let run = || {
        let mut ctl = NetworkController::new(ReferenceEngine::new(scenario.seed));
        let report = runner(false).run(&scenario, &mut ctl).unwrap();
        (report, ctl.into_engine().inbox(NodeId::new(2)).to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_bad_steps_stop_run() {
    let scenario = scenario("bad_steps.json");
    let mut ctl = NetworkController::new(ReferenceEngine::new(scenario.seed));
    let err = runner(false).run(&scenario, &mut ctl).unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Control(ControlError::UnknownDestination(NodeId(42)))
    ));
}

#[test]
fn test_bad_steps_skipped_with_keep_going() {
    let scenario = scenario("bad_steps.json");
    let mut ctl = NetworkController::new(ReferenceEngine::new(scenario.seed));
    let report = runner(true).run(&scenario, &mut ctl).unwrap();

    assert_eq!(report.steps_failed, 2);
    assert_eq!(report.steps_executed, 5);
    assert_eq!(report.commands_dispatched, 1);
    assert_eq!(ctl.engine().inbox(NodeId::new(1)).len(), 1);
}

#[test]
fn test_check_rejects_out_of_range_fields() {
    let err = runner(false).check(&scenario("bad_steps.json")).unwrap_err();
    assert!(matches!(err, RunnerError::Control(ControlError::Command(_))));
}

#[test]
fn test_check_requires_one_topology() {
    let scenario = Scenario {
        seed: 0,
        steps: vec![Step::BootAll],
    };
    assert!(matches!(
        runner(false).check(&scenario),
        Err(RunnerError::Scenario(_))
    ));
}

#[test]
fn test_check_rejects_steps_before_topology() {
    let yaml = r#"
steps:
  - op: run_time
    seconds: 1
  - op: add_channel
    name: command
  - op: load_noise
    file: meyer-short.txt
  - op: load_topology
    file: example.topo
"#;
    let scenario = Scenario::from_yaml_str(yaml).unwrap();
    match runner(false).check(&scenario) {
        Err(RunnerError::Scenario(message)) => assert!(message.contains("step 2")),
        other => panic!("expected ordering error, got {:?}", other),
    }

    let reordered = Scenario {
        seed: 0,
        steps: vec![
            scenario.steps[0].clone(),
            scenario.steps[1].clone(),
            scenario.steps[3].clone(),
            scenario.steps[2].clone(),
            Step::BootAll,
        ],
    };
    runner(false).check(&reordered).unwrap();
}

#[test]
fn test_missing_topology_file() {
    let scenario = Scenario {
        seed: 0,
        steps: vec![Step::LoadTopology {
            file: PathBuf::from("absent.topo"),
        }],
    };
    let mut ctl = NetworkController::new(ReferenceEngine::new(0));
    assert!(matches!(
        runner(true).run(&scenario, &mut ctl),
        Err(RunnerError::Io { .. })
    ));
}
