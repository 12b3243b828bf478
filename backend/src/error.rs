//! Simulation error taxonomy
//!
//! Three failure classes exist, with very different severities:
//!
//! - [`SimulationError::Configuration`]: rejected up front, before any event
//!   is scheduled. A run never starts from a bad configuration.
//! - [`SimulationError::CausalityViolation`] and
//!   [`SimulationError::MutualExclusionViolation`]: fatal. Either one means a
//!   logic bug in the controller or generator, so the run terminates
//!   immediately and the error carries a rendered dump of the offending
//!   state for debugging.
//!
//! Non-convergence of an adaptive run is NOT an error: the capped result is
//! still useful for inspection, so it is surfaced as a status flag on the
//! report (see `ConvergenceStatus`).

use crate::core::time::Seconds;
use thiserror::Error;

/// Errors that can terminate a simulation run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Configuration rejected before the run started
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The scheduler or clock was asked to move backward in time
    #[error("causality violation: event at t={event_time} scheduled while clock at t={now} ({detail})")]
    CausalityViolation {
        now: Seconds,
        event_time: Seconds,
        detail: String,
    },

    /// An admission would have put opposing directions on the segment together
    #[error("mutual exclusion violation on segment {segment} at t={time}: {state_dump}")]
    MutualExclusionViolation {
        segment: usize,
        time: Seconds,
        /// Rendered controller state and queue contents at the moment of failure
        state_dump: String,
    },

    /// Config or report (de)serialization failed at the JSON boundary
    #[error("serialization error: {0}")]
    Serialization(String),
}
