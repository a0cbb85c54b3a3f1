//! # motesim-model
//!
//! Parsing of the two text descriptions a simulation run starts from:
//!
//! - **Topology** ([`Topology`]): a declared node count on the first line,
//!   then one `source destination gain` link per line.
//! - **Noise** ([`NoiseTrace`]): one integer noise-floor reading per line.
//!
//! Parsing is pure; reading the files is the caller's job.

mod noise;
mod topology;

pub use noise::NoiseTrace;
pub use topology::{Link, Topology};

use thiserror::Error;

/// Errors produced while parsing model descriptions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A topology line could not be parsed.
    #[error("Malformed topology at line {line}: {reason}")]
    MalformedTopology {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A noise line could not be parsed.
    #[error("Malformed noise trace at line {line}: {reason}")]
    MalformedNoise {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The noise description has no readings.
    #[error("Noise trace has no readings")]
    EmptyNoiseTrace,
}

impl ModelError {
    pub(crate) fn topology(line: usize, reason: impl Into<String>) -> Self {
        ModelError::MalformedTopology {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn noise(line: usize, reason: impl Into<String>) -> Self {
        ModelError::MalformedNoise {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for model parsing.
pub type ModelResult<T> = Result<T, ModelError>;
