//! Simulation driver, stopping rules, Monte-Carlo repetition, and reports

pub mod engine;
pub mod fingerprint;
pub mod monte_carlo;

pub use engine::{
    run, validate_config, ConvergenceStatus, LengthShare, RunReport, SegmentConfig,
    SegmentReport, Simulation, SimulationConfig, StopRule, StreamConfig, StreamReport,
};
pub use fingerprint::compute_config_hash;
pub use monte_carlo::{
    aggregate, run_repetitions, AggregateReport, AggregateSegmentReport, AggregateStreamReport,
};
