//! Arrival process generation
//!
//! Each stream's demand is a Poisson process: inter-arrival gaps are drawn
//! from an exponential distribution with the stream's rate λ. The process is
//! self-feeding (consuming one arrival immediately schedules the next), but
//! the sampling itself is a pure function of (process parameters, clock, RNG)
//! so it can be tested in isolation and audited independently of the event
//! handlers that call it.
//!
//! # Minimum headway
//!
//! An optional minimum headway clamps each drawn gap from below:
//! `realized = max(drawn, headway)`. This is NOT rate-preserving. With rate λ
//! and headway h the realized mean gap is
//!
//! ```text
//! E[gap] = h + exp(-λh) / λ
//! ```
//!
//! (the exponential's memorylessness past the cutoff), so the effective
//! arrival rate drops to `1 / (h + exp(-λh)/λ)`. Callers that need a target
//! throughput under a headway constraint must compensate λ themselves;
//! [`ArrivalProcess::effective_rate`] exposes the adjusted value so nothing
//! about the clamp is silent.

use crate::core::time::Seconds;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Arrival parameters for a single stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalConfig {
    /// Mean arrivals per hour (Poisson λ, per-hour units). Zero means the
    /// stream never generates arrivals but still participates in arbitration
    /// as a permanently empty queue.
    pub rate_per_hour: f64,

    /// Minimum realized gap between consecutive arrivals, seconds
    #[serde(default)]
    pub min_headway: Seconds,
}

/// Sampler for one stream's exponential inter-arrival gaps
#[derive(Debug, Clone)]
pub struct ArrivalProcess {
    /// Arrival rate in events per second (0 = silent stream)
    rate_per_sec: f64,

    /// Lower clamp on realized gaps, seconds
    min_headway: Seconds,
}

impl ArrivalProcess {
    /// Build a process from a validated config
    pub fn new(config: &ArrivalConfig) -> Self {
        Self {
            rate_per_sec: config.rate_per_hour / 3600.0,
            min_headway: config.min_headway,
        }
    }

    /// Arrival rate in events per second, before the headway clamp
    pub fn rate_per_sec(&self) -> f64 {
        self.rate_per_sec
    }

    /// True when the stream never produces arrivals
    pub fn is_silent(&self) -> bool {
        self.rate_per_sec <= 0.0
    }

    /// Effective arrival rate after the headway clamp, events per second
    ///
    /// Equals `1 / (h + exp(-λh)/λ)`; reduces to λ when the headway is zero.
    /// Returns 0 for a silent stream.
    pub fn effective_rate(&self) -> f64 {
        if self.is_silent() {
            return 0.0;
        }
        let lambda = self.rate_per_sec;
        let h = self.min_headway;
        1.0 / (h + (-lambda * h).exp() / lambda)
    }

    /// Sample the timestamp of the next arrival after `now`
    ///
    /// Returns `None` for a silent stream (infinite inter-arrival time): the
    /// generator is simply never invoked again for it. The driver discards
    /// results beyond the scheduling horizon; that cutoff is not this
    /// function's concern.
    pub fn next_arrival(&self, now: Seconds, rng: &mut RngManager) -> Option<Seconds> {
        if self.is_silent() {
            return None;
        }
        // u ∈ (0, 1] so ln(u) is finite and the gap non-negative
        let u = rng.next_open_closed();
        let drawn = -u.ln() / self.rate_per_sec;
        let gap = drawn.max(self.min_headway);
        Some(now + gap)
    }
}
