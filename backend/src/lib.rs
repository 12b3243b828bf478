//! Traffic Simulator Core - Rust Engine
//!
//! Discrete-event simulation of time-shared access to exclusive resources:
//! one-lane road segments, parking lifts, narrow bridges, anything that
//! serves competing directional demand streams one direction at a time. The
//! clock jumps between event timestamps rather than stepping a fixed tick,
//! so rare and bursty dynamics are captured at event resolution.
//!
//! # Architecture
//!
//! - **core**: simulation clock and window indexing
//! - **scheduler**: time-ordered future event list
//! - **arrivals**: exponential arrival processes (self-feeding)
//! - **models**: streams, segments, transition trace
//! - **controller**: segment access state machine (the mutual-exclusion core)
//! - **stats**: time-weighted statistics collection
//! - **orchestrator**: driver loop, stopping rules, Monte-Carlo, reports
//! - **rng**: deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. A run is a pure function of (configuration, seed)
//! 2. Opposing directions never occupy a segment simultaneously
//! 3. Event times popped from the scheduler never decrease

// Module declarations
pub mod arrivals;
pub mod controller;
pub mod core;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod scheduler;
pub mod stats;

// Re-exports for convenience
pub use arrivals::{ArrivalConfig, ArrivalProcess};
pub use controller::{ControllerState, SegmentController};
pub use crate::core::time::{Seconds, SimClock};
pub use error::SimulationError;
pub use models::{Direction, EventLog, SegmentId, Stream, StreamId, TraceEvent};
pub use orchestrator::{
    aggregate, run, run_repetitions, AggregateReport, ConvergenceStatus, RunReport,
    SegmentConfig, Simulation, SimulationConfig, StopRule, StreamConfig,
};
pub use rng::RngManager;
pub use scheduler::{Event, EventKind, EventQueue};
pub use stats::StatsCollector;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn traffic_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::run_simulation, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::run_monte_carlo, m)?)?;
    Ok(())
}
