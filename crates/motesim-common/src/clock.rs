//! Discrete-event clock over a [`SimEngine`].
//!
//! The clock never moves time itself. It asks the engine to process events
//! and reads back the engine's time.

use crate::{SimEngine, SimTime};
use tracing::{debug, trace};

/// Events processed per nominal second by [`SimulationClock::advance_approx`].
///
/// This is a fixed scale factor, not a measured rate; it does not track
/// simulated or wall-clock seconds.
pub const EVENTS_PER_NOMINAL_SECOND: u64 = 1000;

/// Wraps the engine's event queue and counts the events it has driven.
#[derive(Debug)]
pub struct SimulationClock<E> {
    engine: E,
    events_processed: u64,
}

impl<E: SimEngine> SimulationClock<E> {
    /// Create a clock driving `engine`.
    pub fn new(engine: E) -> Self {
        SimulationClock {
            engine,
            events_processed: 0,
        }
    }

    /// Current engine time.
    pub fn current_time(&self) -> SimTime {
        self.engine.time()
    }

    /// Process up to `events` pending events in the engine's order.
    ///
    /// Returns the number actually processed, which is smaller than
    /// `events` only if the engine ran out of queued events.
    pub fn advance(&mut self, events: u64) -> u64 {
        let mut processed = 0;
        while processed < events {
            if !self.engine.run_next_event() {
                debug!(
                    requested = events,
                    processed,
                    time = self.engine.time().as_ticks(),
                    "event queue drained before advance completed"
                );
                break;
            }
            processed += 1;
        }
        self.events_processed += processed;
        trace!(processed, time = self.engine.time().as_ticks(), "clock advanced");
        processed
    }

    /// Process `seconds * EVENTS_PER_NOMINAL_SECOND` events.
    pub fn advance_approx(&mut self, seconds: u64) -> u64 {
        self.advance(seconds.saturating_mul(EVENTS_PER_NOMINAL_SECOND))
    }

    /// Total events processed through this clock.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Get the wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Get mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the clock, returning the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }
}
