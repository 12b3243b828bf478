//! Time management for the simulation
//!
//! The simulation runs on a continuous clock: the event loop jumps the clock
//! directly from one event timestamp to the next instead of stepping a fixed
//! tick. This module provides the monotonic clock and the fixed-window
//! indexing used by the per-window statistics.

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};

/// Simulated time in seconds. Always finite and non-negative.
pub type Seconds = f64;

/// Monotonic simulation clock
///
/// The clock only moves forward. Attempting to move it backward indicates a
/// scheduling bug upstream and fails with [`SimulationError::CausalityViolation`].
///
/// # Example
/// ```
/// use traffic_simulator_core_rs::SimClock;
///
/// let mut clock = SimClock::new();
/// assert_eq!(clock.now(), 0.0);
///
/// clock.advance_to(12.5).unwrap();
/// assert_eq!(clock.now(), 12.5);
///
/// // Going backward is a logic error
/// assert!(clock.advance_to(3.0).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Seconds elapsed since simulation start
    now: Seconds,
}

impl SimClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current simulated time in seconds
    pub fn now(&self) -> Seconds {
        self.now
    }

    /// Advance the clock to `time`
    ///
    /// `time` may equal the current time (simultaneous events share a
    /// timestamp and are ordered by sequence number).
    pub fn advance_to(&mut self, time: Seconds) -> Result<(), SimulationError> {
        if time < self.now {
            return Err(SimulationError::CausalityViolation {
                now: self.now,
                event_time: time,
                detail: "clock asked to move backward".to_string(),
            });
        }
        self.now = time;
        Ok(())
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the fixed-length statistics window containing `time`
///
/// Window 0 covers `[0, window_len)`, window 1 covers `[window_len, 2*window_len)`
/// and so on. `window_len` must be positive (enforced at configuration
/// validation, before any simulation state exists).
pub fn window_index(time: Seconds, window_len: Seconds) -> usize {
    (time / window_len).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_advance_forward_and_equal() {
        let mut clock = SimClock::new();
        clock.advance_to(5.0).unwrap();
        clock.advance_to(5.0).unwrap(); // same instant is fine
        clock.advance_to(7.25).unwrap();
        assert_eq!(clock.now(), 7.25);
    }

    #[test]
    fn test_advance_backward_fails() {
        let mut clock = SimClock::new();
        clock.advance_to(10.0).unwrap();
        let err = clock.advance_to(9.999).unwrap_err();
        assert!(matches!(err, SimulationError::CausalityViolation { .. }));
    }

    #[test]
    fn test_window_index() {
        assert_eq!(window_index(0.0, 3600.0), 0);
        assert_eq!(window_index(3599.999, 3600.0), 0);
        assert_eq!(window_index(3600.0, 3600.0), 1);
        assert_eq!(window_index(7200.5, 3600.0), 2);
    }
}
