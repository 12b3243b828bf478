//! PyO3 bindings
//!
//! The Python interface to the simulation core. The original front-end is a
//! Python web application, so the boundary speaks JSON both ways: a
//! configuration document in, a report document out. All conversion goes
//! through the same serde types the rest of the crate uses; the FFI layer
//! owns no format of its own.
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from traffic_simulator_core_rs import run_simulation
//!
//! config = {
//!     "segments": [{
//!         "name": "narrow_bridge",
//!         "crossing_duration": 5.4,
//!         "streams": [
//!             {"name": "northbound", "direction": "a_to_b",
//!              "arrivals": {"rate_per_hour": 15.0}},
//!             {"name": "southbound", "direction": "b_to_a",
//!              "arrivals": {"rate_per_hour": 15.0}},
//!         ],
//!     }],
//!     "stop": {"mode": "fixed_horizon", "horizon": 3600000.0},
//! }
//!
//! report = json.loads(run_simulation(json.dumps(config), seed=42))
//! print(report["segments"][0]["utilization_pct"])
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::SimulationError;
use crate::orchestrator::{aggregate, run, run_repetitions, SimulationConfig};

fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::Configuration(_) | SimulationError::Serialization(_) => {
            PyValueError::new_err(err.to_string())
        }
        // Fatal invariant breaches surface as runtime errors with the full
        // state dump in the message.
        SimulationError::CausalityViolation { .. }
        | SimulationError::MutualExclusionViolation { .. } => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

fn parse_config(config_json: &str) -> PyResult<SimulationConfig> {
    serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("invalid configuration JSON: {e}")))
}

/// Run one simulation and return the report as JSON
#[pyfunction]
pub fn run_simulation(config_json: &str, seed: u64) -> PyResult<String> {
    let config = parse_config(config_json)?;
    let report = run(&config, seed).map_err(to_py_err)?;
    serde_json::to_string(&report)
        .map_err(|e| PyRuntimeError::new_err(format!("report serialization failed: {e}")))
}

/// Run the configured number of repetitions and return the aggregate as JSON
///
/// Seeds are consecutive starting at `base_seed`; runs execute in parallel.
#[pyfunction]
pub fn run_monte_carlo(config_json: &str, base_seed: u64) -> PyResult<String> {
    let config = parse_config(config_json)?;
    let runs = run_repetitions(&config, base_seed).map_err(to_py_err)?;
    let report = aggregate(&runs)
        .ok_or_else(|| PyValueError::new_err("repetitions must be at least 1"))?;
    serde_json::to_string(&report)
        .map_err(|e| PyRuntimeError::new_err(format!("report serialization failed: {e}")))
}
