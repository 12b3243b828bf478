//! Simulation driver
//!
//! Main event loop integrating all components:
//! - Arrival generation (self-feeding exponential processes)
//! - Event scheduling (time-ordered, sequence tie-break)
//! - Segment access control (mutual-exclusion state machines)
//! - Statistics collection (time-weighted, observed at every event boundary)
//! - Stopping rules (fixed horizon or adaptive convergence)
//!
//! # Loop shape
//!
//! ```text
//! prime: schedule each stream's first arrival
//! loop:
//!   pop earliest event
//!   evaluate any adaptive sampling-window boundaries passed
//!   advance the clock (never backward)
//!   close the statistics interval at the OLD queue lengths
//!   dispatch to the owning segment controller
//! finalize statistics at the horizon actually used
//! ```
//!
//! A run is a pure function of (configuration, seed): all mutable state
//! (clock, scheduler, streams, controllers, RNG, accumulators, trace) lives
//! in the `Simulation` value, so independent runs cannot interfere and
//! Monte-Carlo repetitions parallelize without locking.
//!
//! # Example
//!
//! ```
//! use traffic_simulator_core_rs::orchestrator::{
//!     run, SegmentConfig, SimulationConfig, StopRule, StreamConfig,
//! };
//! use traffic_simulator_core_rs::arrivals::ArrivalConfig;
//! use traffic_simulator_core_rs::models::Direction;
//!
//! let config = SimulationConfig {
//!     segments: vec![SegmentConfig {
//!         name: "narrow_bridge".to_string(),
//!         crossing_duration: 5.4,
//!         switch_over: 0.0,
//!         follow_up_headway: 0.0,
//!         streams: vec![
//!             StreamConfig {
//!                 name: "northbound".to_string(),
//!                 direction: Direction::AToB,
//!                 arrivals: ArrivalConfig { rate_per_hour: 15.0, min_headway: 0.0 },
//!             },
//!             StreamConfig {
//!                 name: "southbound".to_string(),
//!                 direction: Direction::BToA,
//!                 arrivals: ArrivalConfig { rate_per_hour: 15.0, min_headway: 0.0 },
//!             },
//!         ],
//!     }],
//!     stop: StopRule::FixedHorizon { horizon: 36_000.0 },
//!     stats_window: 3600.0,
//!     trace_enabled: false,
//!     repetitions: 1,
//! };
//!
//! let report = run(&config, 42).unwrap();
//! assert_eq!(report.streams.len(), 2);
//! ```

use crate::arrivals::{ArrivalConfig, ArrivalProcess};
use crate::controller::SegmentController;
use crate::core::time::{SimClock, Seconds};
use crate::error::SimulationError;
use crate::models::{Direction, EventLog, SegmentId, SegmentTiming, Stream, StreamId};
use crate::orchestrator::fingerprint::compute_config_hash;
use crate::rng::RngManager;
use crate::scheduler::{EventKind, EventQueue};
use crate::stats::StatsCollector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete simulation configuration
///
/// Validated as a whole before any event is scheduled: a bad configuration is
/// rejected outright, never partially simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Exclusive segments, each with its own controller and demand streams
    pub segments: Vec<SegmentConfig>,

    /// When the run terminates
    pub stop: StopRule,

    /// Length of the statistics window for per-window maxima, seconds
    #[serde(default = "default_stats_window")]
    pub stats_window: Seconds,

    /// Record the full transition trace (memory-heavy on long runs)
    #[serde(default)]
    pub trace_enabled: bool,

    /// Independent repetitions for Monte-Carlo averaging (consecutive seeds)
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
}

fn default_stats_window() -> Seconds {
    3600.0
}

fn default_repetitions() -> usize {
    1
}

/// Configuration of one exclusive segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Identifier used in reports
    pub name: String,

    /// Time one entity needs to cross, seconds (must be positive)
    pub crossing_duration: Seconds,

    /// Clearance delay after vacating before the opposite direction may
    /// start, seconds
    #[serde(default)]
    pub switch_over: Seconds,

    /// Minimum gap between consecutive same-direction admissions, seconds
    #[serde(default)]
    pub follow_up_headway: Seconds,

    /// Demand streams feeding this segment; list order is the stable
    /// priority order for arbitration tie-breaks
    pub streams: Vec<StreamConfig>,
}

/// Configuration of one directional demand stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Identifier used in reports (unique across the whole configuration)
    pub name: String,

    /// Travel direction over the owning segment
    pub direction: Direction,

    /// Arrival process parameters
    pub arrivals: ArrivalConfig,
}

/// Termination rule for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopRule {
    /// Stop once the clock passes a configured duration
    FixedHorizon { horizon: Seconds },

    /// Stop once the summary statistic (cumulative time-weighted mean queue
    /// length over all streams) changes by at most `tolerance` between two
    /// consecutive sampling windows, or at `max_horizon`, whichever comes
    /// first. Hitting the cap is reported, never silent: parameter regimes
    /// with ρ ≥ 1 do not converge.
    Adaptive {
        sample_window: Seconds,
        tolerance: f64,
        max_horizon: Seconds,
    },
}

// ============================================================================
// Report Types
// ============================================================================

/// How a run terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// Fixed-horizon run; ran to its configured duration
    FixedHorizon,
    /// Adaptive run; the summary statistic stabilized within tolerance
    Converged,
    /// Adaptive run; the hard cap was reached without stabilizing
    HitHardCap,
}

/// A (length, share-of-time) pair in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthShare {
    pub length: usize,
    pub pct: f64,
}

/// Per-stream results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamReport {
    pub name: String,
    pub total_arrivals: u64,

    /// Time-weighted queue-length distribution, percentages of the horizon
    pub queue_length_pct: Vec<LengthShare>,

    /// Distribution of per-window maximum queue length, percentages of
    /// windows
    pub window_max_pct: Vec<LengthShare>,

    /// Entities admitted (each contributes one wait sample)
    pub wait_count: u64,

    /// Mean wait from arrival to admission, seconds
    pub mean_wait: Seconds,

    /// Arrivals that landed while the segment was serving this stream's own
    /// direction / the opposing direction
    pub arrivals_while_same_serving: u64,
    pub arrivals_while_opposite_serving: u64,
}

/// Per-segment results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub name: String,

    /// Share of the horizon with at least one occupant, percent
    pub utilization_pct: f64,

    /// Time-averaged number of entities on the segment. By Little's law this
    /// equals throughput × crossing duration for any stable run, so it is
    /// the "linear demand" figure to compare against λτ. Differs from the
    /// busy-time share whenever same-direction crossings overlap.
    pub mean_occupancy: f64,

    /// Time-weighted occupancy distribution, percentages of the horizon
    pub occupancy_pct: Vec<LengthShare>,

    pub completed_crossings: u64,
    pub crossings_per_hour: f64,
}

/// Aggregated results of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,

    /// SHA-256 of the canonical configuration JSON
    pub config_hash: String,

    /// Horizon actually simulated, seconds
    pub horizon: Seconds,

    pub convergence: ConvergenceStatus,
    pub streams: Vec<StreamReport>,
    pub segments: Vec<SegmentReport>,
}

// ============================================================================
// Validation
// ============================================================================

fn require(cond: bool, msg: impl FnOnce() -> String) -> Result<(), SimulationError> {
    if cond {
        Ok(())
    } else {
        Err(SimulationError::Configuration(msg()))
    }
}

fn finite_non_negative(value: f64, what: &str, owner: &str) -> Result<(), SimulationError> {
    require(value.is_finite() && value >= 0.0, || {
        format!("{what} of {owner} must be finite and non-negative, got {value}")
    })
}

/// Validate a configuration before any simulation state is built
pub fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
    require(!config.segments.is_empty(), || {
        "at least one segment is required".to_string()
    })?;
    require(
        config.stats_window.is_finite() && config.stats_window > 0.0,
        || format!("stats_window must be positive, got {}", config.stats_window),
    )?;
    require(config.repetitions >= 1, || {
        "repetitions must be at least 1".to_string()
    })?;

    let mut stream_names = HashSet::new();
    for segment in &config.segments {
        require(
            segment.crossing_duration.is_finite() && segment.crossing_duration > 0.0,
            || {
                format!(
                    "crossing_duration of segment '{}' must be positive, got {}",
                    segment.name, segment.crossing_duration
                )
            },
        )?;
        finite_non_negative(segment.switch_over, "switch_over", &segment.name)?;
        finite_non_negative(segment.follow_up_headway, "follow_up_headway", &segment.name)?;
        require(!segment.streams.is_empty(), || {
            format!("segment '{}' has no streams", segment.name)
        })?;

        for stream in &segment.streams {
            finite_non_negative(
                stream.arrivals.rate_per_hour,
                "arrival rate",
                &stream.name,
            )?;
            finite_non_negative(stream.arrivals.min_headway, "min_headway", &stream.name)?;
            require(stream_names.insert(stream.name.clone()), || {
                format!("duplicate stream name '{}'", stream.name)
            })?;
        }
    }

    match config.stop {
        StopRule::FixedHorizon { horizon } => {
            require(horizon.is_finite() && horizon > 0.0, || {
                format!("horizon must be positive, got {horizon}")
            })?;
        }
        StopRule::Adaptive {
            sample_window,
            tolerance,
            max_horizon,
        } => {
            require(sample_window.is_finite() && sample_window > 0.0, || {
                format!("sample_window must be positive, got {sample_window}")
            })?;
            require(tolerance.is_finite() && tolerance >= 0.0, || {
                format!("tolerance must be non-negative, got {tolerance}")
            })?;
            require(
                max_horizon.is_finite() && max_horizon >= sample_window,
                || {
                    format!(
                        "max_horizon ({max_horizon}) must be at least one sample_window \
                         ({sample_window})"
                    )
                },
            )?;
        }
    }

    Ok(())
}

// ============================================================================
// Simulation
// ============================================================================

/// Why the event loop stopped
enum EndReason {
    /// The next event lies past the scheduling horizon
    HorizonReached,
    /// Adaptive summary statistic stabilized at a window boundary
    Converged { at: Seconds },
    /// No events left (every stream silent or exhausted)
    QueueExhausted,
}

/// One simulation run: owns every piece of mutable run state
///
/// # Determinism
///
/// All randomness flows through the seeded xorshift64* generator; event ties
/// resolve by insertion sequence. Same configuration + same seed = identical
/// report, bit for bit.
pub struct Simulation {
    seed: u64,
    config_hash: String,
    stop: StopRule,
    stats_window: Seconds,

    clock: SimClock,
    scheduler: EventQueue,
    rng: RngManager,
    stats: StatsCollector,
    trace: EventLog,

    streams: Vec<Stream>,
    stream_names: Vec<String>,
    segment_names: Vec<String>,
    controllers: Vec<SegmentController>,
    processes: Vec<ArrivalProcess>,

    /// Latest time at which new arrivals may still be scheduled
    scheduling_horizon: Seconds,

    /// Scratch buffers for per-event statistics snapshots
    len_buf: Vec<usize>,
    occ_buf: Vec<u32>,
}

impl Simulation {
    /// Build a run from a validated configuration and a seed
    pub fn new(config: &SimulationConfig, seed: u64) -> Result<Self, SimulationError> {
        validate_config(config)?;
        let config_hash = compute_config_hash(config)?;

        let mut streams = Vec::new();
        let mut stream_names = Vec::new();
        let mut segment_names = Vec::new();
        let mut controllers = Vec::new();
        let mut processes = Vec::new();

        for (seg_idx, segment) in config.segments.iter().enumerate() {
            let segment_id = SegmentId(seg_idx);
            let timing = SegmentTiming {
                crossing_duration: segment.crossing_duration,
                switch_over: segment.switch_over,
                follow_up_headway: segment.follow_up_headway,
            };

            let mut member_ids = Vec::new();
            for stream_cfg in &segment.streams {
                let stream_id = StreamId(streams.len());
                member_ids.push(stream_id);
                streams.push(Stream::new(
                    stream_id,
                    stream_cfg.name.clone(),
                    stream_cfg.direction,
                    segment_id,
                ));
                stream_names.push(stream_cfg.name.clone());
                processes.push(ArrivalProcess::new(&stream_cfg.arrivals));
            }

            segment_names.push(segment.name.clone());
            controllers.push(SegmentController::new(segment_id, timing, member_ids));
        }

        let scheduling_horizon = match config.stop {
            StopRule::FixedHorizon { horizon } => horizon,
            StopRule::Adaptive { max_horizon, .. } => max_horizon,
        };

        let num_streams = streams.len();
        let num_segments = controllers.len();

        Ok(Self {
            seed,
            config_hash,
            stop: config.stop,
            stats_window: config.stats_window,
            clock: SimClock::new(),
            scheduler: EventQueue::new(),
            rng: RngManager::new(seed),
            stats: StatsCollector::new(num_streams, num_segments, config.stats_window),
            trace: EventLog::new(config.trace_enabled),
            streams,
            stream_names,
            segment_names,
            controllers,
            processes,
            scheduling_horizon,
            len_buf: vec![0; num_streams],
            occ_buf: vec![0; num_segments],
        })
    }

    /// The transition trace (empty unless `trace_enabled`)
    pub fn trace(&self) -> &EventLog {
        &self.trace
    }

    /// Refresh the scratch snapshot of current queue lengths and occupancies
    fn refresh_snapshot(&mut self) {
        self.len_buf.clear();
        self.len_buf.extend(self.streams.iter().map(|s| s.queue_len()));
        self.occ_buf.clear();
        self.occ_buf
            .extend(self.controllers.iter().map(|c| c.occupancy()));
    }

    /// Close the statistics interval ending at `time` using current state
    fn observe_at(&mut self, time: Seconds) {
        self.refresh_snapshot();
        self.stats.observe(time, &self.len_buf, &self.occ_buf);
    }

    /// Execute the run to its stop condition and produce the report
    ///
    /// Consumes no external state; call once per `Simulation` value.
    pub fn run(&mut self) -> Result<RunReport, SimulationError> {
        // Prime each stream's first arrival. Silent streams (rate 0) are
        // never scheduled but keep participating in arbitration as
        // permanently empty queues.
        for (idx, process) in self.processes.iter().enumerate() {
            if let Some(first) = process.next_arrival(0.0, &mut self.rng) {
                if first <= self.scheduling_horizon {
                    self.scheduler.schedule(
                        first,
                        EventKind::Arrival {
                            stream: StreamId(idx),
                        },
                    )?;
                }
            }
        }

        let mut next_check = match self.stop {
            StopRule::Adaptive { sample_window, .. } => Some(sample_window),
            StopRule::FixedHorizon { .. } => None,
        };
        let mut prev_summary: Option<f64> = None;

        let reason = 'run: loop {
            let Some(event) = self.scheduler.pop_next() else {
                break 'run EndReason::QueueExhausted;
            };

            // Evaluate every sampling-window boundary the clock is about to
            // jump over, in order, before handling the event itself.
            if let StopRule::Adaptive {
                sample_window,
                tolerance,
                ..
            } = self.stop
            {
                while let Some(check) = next_check {
                    if check > event.time.min(self.scheduling_horizon) {
                        break;
                    }
                    self.observe_at(check);
                    let summary = self.stats.mean_queue_length();
                    if let Some(prev) = prev_summary {
                        if (summary - prev).abs() <= tolerance {
                            break 'run EndReason::Converged { at: check };
                        }
                    }
                    prev_summary = Some(summary);
                    next_check = Some(check + sample_window);
                }
            }

            if event.time > self.scheduling_horizon {
                break 'run EndReason::HorizonReached;
            }

            self.clock.advance_to(event.time)?;
            self.observe_at(event.time);

            match event.kind {
                EventKind::Arrival { stream } => {
                    // Re-arm first: consuming an arrival immediately
                    // schedules the stream's successor (self-feeding), unless
                    // the successor falls beyond the horizon, in which case
                    // it is discarded rather than scheduled.
                    if let Some(next) =
                        self.processes[stream.0].next_arrival(event.time, &mut self.rng)
                    {
                        if next <= self.scheduling_horizon {
                            self.scheduler
                                .schedule(next, EventKind::Arrival { stream })?;
                        }
                    }

                    let segment = self.streams[stream.0].segment();
                    self.controllers[segment.0].on_arrival(
                        event.time,
                        stream,
                        &mut self.streams,
                        &mut self.scheduler,
                        &mut self.stats,
                        &mut self.trace,
                    )?;
                }
                EventKind::ServiceComplete { segment } => {
                    self.controllers[segment.0].on_service_complete(
                        event.time,
                        &mut self.streams,
                        &mut self.scheduler,
                        &mut self.stats,
                        &mut self.trace,
                    )?;
                }
                EventKind::ControllerRecheck { segment } => {
                    self.controllers[segment.0].on_recheck(
                        event.time,
                        &mut self.streams,
                        &mut self.scheduler,
                        &mut self.stats,
                        &mut self.trace,
                    )?;
                }
            }
        };

        // A drained queue freezes the state (idle controllers, empty queues:
        // anything else would still have a completion or recheck pending).
        // Under adaptive stopping the remaining window boundaries still get
        // evaluated against that frozen state, so convergence is decided by
        // the same rule as everywhere else instead of being assumed.
        let mut reason = reason;
        if matches!(reason, EndReason::QueueExhausted) {
            if let StopRule::Adaptive {
                sample_window,
                tolerance,
                ..
            } = self.stop
            {
                while let Some(check) = next_check {
                    if check > self.scheduling_horizon {
                        break;
                    }
                    self.observe_at(check);
                    let summary = self.stats.mean_queue_length();
                    if let Some(prev) = prev_summary {
                        if (summary - prev).abs() <= tolerance {
                            reason = EndReason::Converged { at: check };
                            break;
                        }
                    }
                    prev_summary = Some(summary);
                    next_check = Some(check + sample_window);
                }
            }
        }

        let (horizon_used, convergence) = match (reason, self.stop) {
            (EndReason::Converged { at }, _) => (at, ConvergenceStatus::Converged),
            (EndReason::HorizonReached, StopRule::FixedHorizon { horizon }) => {
                (horizon, ConvergenceStatus::FixedHorizon)
            }
            (EndReason::HorizonReached, StopRule::Adaptive { max_horizon, .. }) => {
                (max_horizon, ConvergenceStatus::HitHardCap)
            }
            (EndReason::QueueExhausted, StopRule::FixedHorizon { horizon }) => {
                (horizon, ConvergenceStatus::FixedHorizon)
            }
            (EndReason::QueueExhausted, StopRule::Adaptive { max_horizon, .. }) => {
                (max_horizon, ConvergenceStatus::HitHardCap)
            }
        };

        self.refresh_snapshot();
        self.stats
            .finalize(horizon_used, &self.len_buf, &self.occ_buf);

        Ok(self.build_report(horizon_used, convergence))
    }

    /// Assemble the report from the finalized accumulators
    fn build_report(&self, horizon: Seconds, convergence: ConvergenceStatus) -> RunReport {
        let total_windows = (horizon / self.stats_window).ceil().max(1.0) as usize;

        let streams = self
            .streams
            .iter()
            .enumerate()
            .map(|(idx, stream)| {
                let total = self.stats.histogram_total(idx).max(f64::MIN_POSITIVE);
                let queue_length_pct = self
                    .stats
                    .queue_histogram(idx)
                    .iter()
                    .map(|(&length, &duration)| LengthShare {
                        length,
                        pct: duration / total * 100.0,
                    })
                    .collect();

                let window_counts = self.stats.window_max_counts(idx, total_windows);
                let window_max_pct = window_counts
                    .iter()
                    .map(|(&length, &count)| LengthShare {
                        length,
                        pct: count as f64 / total_windows as f64 * 100.0,
                    })
                    .collect();

                let (wait_count, mean_wait) = self.stats.wait_summary(idx);
                StreamReport {
                    name: self.stream_names[idx].clone(),
                    total_arrivals: stream.total_arrivals(),
                    queue_length_pct,
                    window_max_pct,
                    wait_count,
                    mean_wait,
                    arrivals_while_same_serving: stream.arrivals_while_same_serving(),
                    arrivals_while_opposite_serving: stream.arrivals_while_opposite_serving(),
                }
            })
            .collect();

        let segments = self
            .segment_names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let occupancy_total: f64 = self.stats.occupancy_histogram(idx).values().sum();
                let occupancy_total = occupancy_total.max(f64::MIN_POSITIVE);
                let occupancy_pct = self
                    .stats
                    .occupancy_histogram(idx)
                    .iter()
                    .map(|(&occ, &duration)| LengthShare {
                        length: occ as usize,
                        pct: duration / occupancy_total * 100.0,
                    })
                    .collect();

                let mean_occupancy = self
                    .stats
                    .occupancy_histogram(idx)
                    .iter()
                    .map(|(&occ, &duration)| occ as f64 * duration)
                    .sum::<f64>()
                    / horizon;

                let completed = self.stats.completed_crossings(idx);
                SegmentReport {
                    name: name.clone(),
                    utilization_pct: self.stats.utilization_pct(idx, horizon),
                    mean_occupancy,
                    occupancy_pct,
                    completed_crossings: completed,
                    crossings_per_hour: completed as f64 / (horizon / 3600.0),
                }
            })
            .collect();

        RunReport {
            seed: self.seed,
            config_hash: self.config_hash.clone(),
            horizon,
            convergence,
            streams,
            segments,
        }
    }
}

/// Run one simulation: the crate's core in-memory contract
pub fn run(config: &SimulationConfig, seed: u64) -> Result<RunReport, SimulationError> {
    Simulation::new(config, seed)?.run()
}
