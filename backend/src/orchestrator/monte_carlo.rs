//! Monte-Carlo repetition and aggregation
//!
//! A single stochastic run is one sample; stable estimates come from
//! averaging many independent runs. Because each run owns its scheduler,
//! controllers, RNG, and accumulators exclusively, repetitions share no
//! mutable state and parallelize across rayon workers with no locking.
//! Aggregation happens afterward as a separate reduction over the collected
//! reports.
//!
//! Seeds are consecutive from a base seed (`base_seed`, `base_seed + 1`, …),
//! so a batch is as reproducible as a single run.

use crate::error::SimulationError;
use crate::orchestrator::engine::{
    run, ConvergenceStatus, LengthShare, RunReport, SimulationConfig,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Averaged per-stream results across repetitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStreamReport {
    pub name: String,
    pub mean_arrivals: f64,

    /// Queue-length distribution averaged over runs (equal run weights)
    pub queue_length_pct: Vec<LengthShare>,

    /// Per-window maximum distribution averaged over runs
    pub window_max_pct: Vec<LengthShare>,

    pub total_wait_count: u64,
    pub mean_wait: f64,
}

/// Averaged per-segment results across repetitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSegmentReport {
    pub name: String,
    pub mean_utilization_pct: f64,
    pub mean_crossings_per_hour: f64,
}

/// Results of a Monte-Carlo batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub repetitions: usize,
    pub base_seed: u64,
    pub config_hash: String,
    pub converged_runs: usize,
    pub hit_cap_runs: usize,
    pub mean_horizon: f64,
    pub streams: Vec<AggregateStreamReport>,
    pub segments: Vec<AggregateSegmentReport>,
}

/// Run `config.repetitions` independent runs on consecutive seeds
///
/// Runs execute in parallel; the returned reports are ordered by seed
/// regardless of completion order. The first error (if any) aborts the batch.
pub fn run_repetitions(
    config: &SimulationConfig,
    base_seed: u64,
) -> Result<Vec<RunReport>, SimulationError> {
    (0..config.repetitions as u64)
        .into_par_iter()
        .map(|offset| run(config, base_seed.wrapping_add(offset)))
        .collect()
}

/// Average a batch of per-run reports into one aggregate
///
/// Every run carries equal weight. With a fixed horizon this matches
/// duration-weighted averaging exactly; under adaptive stopping (runs of
/// unequal length) it treats each independent run as one sample, which is
/// the estimator Monte-Carlo repetition calls for.
pub fn aggregate(runs: &[RunReport]) -> Option<AggregateReport> {
    let first = runs.first()?;
    let n = runs.len() as f64;

    let converged_runs = runs
        .iter()
        .filter(|r| r.convergence == ConvergenceStatus::Converged)
        .count();
    let hit_cap_runs = runs
        .iter()
        .filter(|r| r.convergence == ConvergenceStatus::HitHardCap)
        .count();
    let mean_horizon = runs.iter().map(|r| r.horizon).sum::<f64>() / n;

    let streams = (0..first.streams.len())
        .map(|idx| {
            let mut queue_pct: BTreeMap<usize, f64> = BTreeMap::new();
            let mut window_pct: BTreeMap<usize, f64> = BTreeMap::new();
            let mut arrivals = 0.0;
            let mut wait_count = 0u64;
            let mut wait_weighted = 0.0;

            for report in runs {
                let stream = &report.streams[idx];
                arrivals += stream.total_arrivals as f64;
                wait_count += stream.wait_count;
                wait_weighted += stream.mean_wait * stream.wait_count as f64;
                for share in &stream.queue_length_pct {
                    *queue_pct.entry(share.length).or_insert(0.0) += share.pct;
                }
                for share in &stream.window_max_pct {
                    *window_pct.entry(share.length).or_insert(0.0) += share.pct;
                }
            }

            AggregateStreamReport {
                name: first.streams[idx].name.clone(),
                mean_arrivals: arrivals / n,
                queue_length_pct: queue_pct
                    .into_iter()
                    .map(|(length, pct)| LengthShare {
                        length,
                        pct: pct / n,
                    })
                    .collect(),
                window_max_pct: window_pct
                    .into_iter()
                    .map(|(length, pct)| LengthShare {
                        length,
                        pct: pct / n,
                    })
                    .collect(),
                total_wait_count: wait_count,
                mean_wait: if wait_count == 0 {
                    0.0
                } else {
                    wait_weighted / wait_count as f64
                },
            }
        })
        .collect();

    let segments = (0..first.segments.len())
        .map(|idx| AggregateSegmentReport {
            name: first.segments[idx].name.clone(),
            mean_utilization_pct: runs
                .iter()
                .map(|r| r.segments[idx].utilization_pct)
                .sum::<f64>()
                / n,
            mean_crossings_per_hour: runs
                .iter()
                .map(|r| r.segments[idx].crossings_per_hour)
                .sum::<f64>()
                / n,
        })
        .collect();

    Some(AggregateReport {
        repetitions: runs.len(),
        base_seed: first.seed,
        config_hash: first.config_hash.clone(),
        converged_runs,
        hit_cap_runs,
        mean_horizon,
        streams,
        segments,
    })
}
