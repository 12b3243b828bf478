//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG with 64-bit state, deterministic by construction.
//! Same seed → same sequence, which is what makes runs replayable: a run is a
//! pure function of (configuration, seed).

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// All randomness in the simulator goes through this type. There is exactly
/// one instance per run, owned by the run context, so independent runs with
/// different seeds never share generator state.
///
/// # Example
/// ```
/// use traffic_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let u = rng.next_f64();          // [0.0, 1.0)
/// let v = rng.next_open_closed();  // (0.0, 1.0], safe to feed to ln()
/// assert!(u >= 0.0 && u < 1.0);
/// assert!(v > 0.0 && v <= 1.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with the given seed
    ///
    /// A zero seed is remapped to 1 (xorshift state must be non-zero).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate the next random u64 and advance the internal state
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Random f64 in the half-open range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next_u64();
        // 53 mantissa bits of uniform randomness divided by 2^53
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Random f64 in the half-open range (0.0, 1.0]
    ///
    /// Exponential sampling takes ln(u) of the result, so zero must be
    /// excluded from the support.
    pub fn next_open_closed(&mut self) -> f64 {
        1.0 - self.next_f64()
    }

    /// Current RNG state, for fingerprinting and replay checks
    pub fn get_state(&self) -> u64 {
        self.state
    }
}
