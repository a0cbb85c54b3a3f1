//! Noise trace descriptions.

use crate::{ModelError, ModelResult};
use std::str::FromStr;
use tracing::debug;

/// Ordered noise-floor readings, replayed by the engine as a time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseTrace {
    readings: Vec<i32>,
}

impl NoiseTrace {
    /// Parse one integer reading per line.
    ///
    /// Blank lines (including trailing ones) produce no reading. A trace
    /// with no readings at all is rejected.
    pub fn parse(description: &str) -> ModelResult<NoiseTrace> {
        let mut readings = Vec::new();
        for (index, line) in description.lines().enumerate() {
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            let reading = value.parse::<i32>().map_err(|_| {
                ModelError::noise(index + 1, format!("expected integer, got {:?}", value))
            })?;
            readings.push(reading);
        }

        if readings.is_empty() {
            return Err(ModelError::EmptyNoiseTrace);
        }
        debug!(readings = readings.len(), "parsed noise trace");
        Ok(NoiseTrace { readings })
    }

    /// Readings in file order.
    pub fn readings(&self) -> &[i32] {
        &self.readings
    }

    /// Number of readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Always false for a parsed trace.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromStr for NoiseTrace {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoiseTrace::parse(s)
    }
}
