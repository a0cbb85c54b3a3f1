//! Metrics declarations for the motesim control plane.
//!
//! Every metric the controller records is declared here as a [`Metric`]
//! constant so names, units and label keys live in one place. The crate
//! re-exports `metrics`; without an installed recorder all recording is a
//! no-op.
//!
//! # Example
//!
//! ```rust
//! use motesim_metrics::{metric_defs, metrics};
//!
//! metrics::counter!(metric_defs::COMMANDS_DISPATCHED.name, "kind" => "ping").increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Only ever incremented.
    Counter,
    /// Set to the latest value.
    Gauge,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        })
    }
}

/// Name, kind and metadata of one recorded metric.
///
/// Declarations are `const`, built with the `with_*` methods:
///
/// ```rust
/// use motesim_metrics::metrics::Unit;
/// use motesim_metrics::{Metric, MetricKind};
///
/// const BOOTS: Metric = Metric::counter("motesim.node.boots_scheduled")
///     .with_description("Boot events scheduled")
///     .with_unit(Unit::Count);
///
/// assert_eq!(BOOTS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Dotted metric name.
    pub name: &'static str,
    /// Counter or gauge.
    pub kind: MetricKind,
    /// One-line description shown by `motesim metrics`.
    pub description: &'static str,
    /// Unit, if any.
    pub unit: Option<Unit>,
    /// Label keys the controller attaches when recording.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Metric {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Metric::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Metric::new(name, MetricKind::Gauge)
    }

    /// Attach a description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Attach a unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attach the label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
        }
    }
}

/// Every metric the controller records.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Command packets handed to the engine.
    ///
    /// Labels: kind
    pub const COMMANDS_DISPATCHED: Metric = Metric::counter("motesim.command.dispatched")
        .with_description("Command packets handed to the engine")
        .with_unit(Unit::Count)
        .with_labels(&["kind"]);

    /// Operations rejected by validation before reaching the engine.
    ///
    /// Labels: reason
    pub const COMMANDS_REJECTED: Metric = Metric::counter("motesim.command.rejected")
        .with_description("Operations rejected before reaching the engine")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    /// Boot events scheduled.
    pub const BOOTS_SCHEDULED: Metric = Metric::counter("motesim.node.boots_scheduled")
        .with_description("Boot events scheduled")
        .with_unit(Unit::Count);

    /// Power toggles forwarded to the engine.
    ///
    /// Labels: state
    pub const POWER_TOGGLES: Metric = Metric::counter("motesim.node.power_toggles")
        .with_description("Power on/off requests forwarded to the engine")
        .with_unit(Unit::Count)
        .with_labels(&["state"]);

    /// Events processed by the clock.
    pub const CLOCK_EVENTS: Metric = Metric::counter("motesim.clock.events_processed")
        .with_description("Engine events processed through the clock")
        .with_unit(Unit::Count);

    /// Noise readings applied across all nodes.
    pub const NOISE_READINGS: Metric = Metric::counter("motesim.noise.readings_applied")
        .with_description("Noise trace readings applied across all nodes")
        .with_unit(Unit::Count);

    /// Current simulation time in engine ticks.
    pub const SIM_TIME: Metric = Metric::gauge("motesim.clock.sim_time_ticks")
        .with_description("Engine time after the last clock advance");

    pub const ALL: &[&Metric] = &[
        &COMMANDS_DISPATCHED,
        &COMMANDS_REJECTED,
        &BOOTS_SCHEDULED,
        &POWER_TOGGLES,
        &CLOCK_EVENTS,
        &NOISE_READINGS,
        &SIM_TIME,
    ];
}

/// Register every description with the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMANDS_DISPATCHED.name, "motesim.command.dispatched");
        assert_eq!(metric_defs::COMMANDS_DISPATCHED.labels, &["kind"]);
        assert_eq!(metric_defs::SIM_TIME.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::CLOCK_EVENTS.unit, Some(Unit::Count));
    }

    #[test]
    fn test_metric_names_unique() {
        let names: std::collections::HashSet<_> =
            metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_bare_declaration() {
        const BARE: Metric = Metric::gauge("bare");
        assert_eq!(BARE.kind, MetricKind::Gauge);
        assert_eq!(BARE.kind.to_string(), "gauge");
        assert!(BARE.description.is_empty());
        assert!(BARE.unit.is_none() && BARE.labels.is_empty());
    }

    #[test]
    fn test_labelled_metrics_declare_keys() {
        assert_eq!(metric_defs::COMMANDS_REJECTED.labels, &["reason"]);
        assert_eq!(metric_defs::POWER_TOGGLES.labels, &["state"]);
        assert!(metric_defs::BOOTS_SCHEDULED.labels.is_empty());
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
