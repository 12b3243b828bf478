//! Time-weighted statistics collection
//!
//! The collector observes every event boundary and accumulates:
//!
//! - per-stream time-weighted queue-length histograms (queue length → total
//!   simulated time spent at that length),
//! - per-stream maximum queue length per fixed window (hourly by default),
//! - per-entity wait times (arrival to admission),
//! - per-segment busy time and time-weighted occupancy histograms, plus
//!   completed-crossing throughput counts.
//!
//! # The old-length rule
//!
//! `observe(now, ...)` must be called with the queue lengths and occupancies
//! that were IN EFFECT during the interval being closed, i.e. before the
//! current event mutates anything. Logging the new length instead shifts
//! every interval by one event and silently corrupts every percentile
//! computed downstream. The driver therefore observes first and dispatches
//! second, always.
//!
//! Waiting-queue length and on-segment occupancy are tracked as separate
//! quantities; reporting decides which (or their sum) to present.

use crate::core::time::{window_index, Seconds};
use std::collections::BTreeMap;

/// Accumulators for one stream
#[derive(Debug, Clone, Default)]
struct StreamStats {
    /// queue length → total time spent at that length
    histogram: BTreeMap<usize, f64>,
    /// max queue length seen per window, indexed by window number
    window_max: Vec<usize>,
    wait_count: u64,
    wait_total: Seconds,
}

/// Accumulators for one segment
#[derive(Debug, Clone, Default)]
struct SegmentStats {
    /// total time with at least one occupant
    busy_time: Seconds,
    /// occupancy → total time spent at that occupancy
    occupancy_histogram: BTreeMap<u32, f64>,
    completed_crossings: u64,
}

/// Write-only statistics collector, read at run end
///
/// One instance per run, owned by the run context.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    window_len: Seconds,
    /// End of the last closed interval
    last_time: Seconds,
    streams: Vec<StreamStats>,
    segments: Vec<SegmentStats>,
}

impl StatsCollector {
    pub fn new(num_streams: usize, num_segments: usize, window_len: Seconds) -> Self {
        Self {
            window_len,
            last_time: 0.0,
            streams: vec![StreamStats::default(); num_streams],
            segments: vec![SegmentStats::default(); num_segments],
        }
    }

    /// End of the last closed interval
    pub fn last_time(&self) -> Seconds {
        self.last_time
    }

    /// Close the interval `(last_time, now]`
    ///
    /// `queue_lens[i]` and `occupancies[j]` are the values that held during
    /// the interval (the pre-event state). A zero-length interval is a no-op
    /// apart from window-max bookkeeping being skipped entirely.
    pub fn observe(&mut self, now: Seconds, queue_lens: &[usize], occupancies: &[u32]) {
        let dt = now - self.last_time;
        if dt <= 0.0 {
            return;
        }

        let start_window = window_index(self.last_time, self.window_len);
        let end_window = window_index(now, self.window_len);

        for (stats, &len) in self.streams.iter_mut().zip(queue_lens) {
            *stats.histogram.entry(len).or_insert(0.0) += dt;

            if stats.window_max.len() <= end_window {
                stats.window_max.resize(end_window + 1, 0);
            }
            // A length that persists across several windows marks every
            // window it touches, not just the one containing the next event.
            for w in start_window..=end_window {
                if stats.window_max[w] < len {
                    stats.window_max[w] = len;
                }
            }
        }

        for (stats, &occ) in self.segments.iter_mut().zip(occupancies) {
            *stats.occupancy_histogram.entry(occ).or_insert(0.0) += dt;
            if occ > 0 {
                stats.busy_time += dt;
            }
        }

        self.last_time = now;
    }

    /// Record one entity's wait (arrival to admission)
    pub fn record_wait(&mut self, stream: usize, wait: Seconds) {
        let stats = &mut self.streams[stream];
        stats.wait_count += 1;
        stats.wait_total += wait;
    }

    /// Count one completed crossing on a segment
    pub fn record_crossing(&mut self, segment: usize) {
        self.segments[segment].completed_crossings += 1;
    }

    /// Flush the final partial interval up to the simulation horizon
    ///
    /// Idempotent: a second call with the same horizon closes a zero-length
    /// interval and changes nothing.
    pub fn finalize(&mut self, horizon: Seconds, queue_lens: &[usize], occupancies: &[u32]) {
        if horizon > self.last_time {
            self.observe(horizon, queue_lens, occupancies);
        }
    }

    // ========================================================================
    // Read side (run end)
    // ========================================================================

    /// Time-weighted queue-length histogram for a stream
    pub fn queue_histogram(&self, stream: usize) -> &BTreeMap<usize, f64> {
        &self.streams[stream].histogram
    }

    /// Total time accumulated in a stream's histogram
    ///
    /// Equals the simulation horizon after `finalize`, for every stream.
    pub fn histogram_total(&self, stream: usize) -> f64 {
        self.streams[stream].histogram.values().sum()
    }

    /// Queue length at or below which the stream spent `p`% of the time
    ///
    /// Walks the histogram in increasing length order until the cumulative
    /// time reaches `p/100 × total`. An empty histogram yields `default`:
    /// degenerate inputs must not fail inside statistics aggregation.
    pub fn percentile(&self, stream: usize, p: f64, default: usize) -> usize {
        let histogram = &self.streams[stream].histogram;
        let total: f64 = histogram.values().sum();
        if total <= 0.0 {
            return default;
        }
        let target = total * (p / 100.0);
        let mut cumulative = 0.0;
        let mut last = default;
        for (&len, &duration) in histogram {
            cumulative += duration;
            last = len;
            if cumulative >= target {
                return len;
            }
        }
        last
    }

    /// (count, mean) of recorded waits for a stream; mean is 0 with no waits
    pub fn wait_summary(&self, stream: usize) -> (u64, Seconds) {
        let stats = &self.streams[stream];
        if stats.wait_count == 0 {
            (0, 0.0)
        } else {
            (stats.wait_count, stats.wait_total / stats.wait_count as f64)
        }
    }

    /// Per-window maximum queue lengths for a stream
    ///
    /// `total_windows` pads trailing all-quiet windows with zero maxima so
    /// the distribution always covers the whole horizon.
    pub fn window_max_counts(&self, stream: usize, total_windows: usize) -> BTreeMap<usize, u64> {
        let stats = &self.streams[stream];
        let mut counts: BTreeMap<usize, u64> = BTreeMap::new();
        for w in 0..total_windows {
            let max = stats.window_max.get(w).copied().unwrap_or(0);
            *counts.entry(max).or_insert(0) += 1;
        }
        counts
    }

    /// Fraction of `[0, horizon]` a segment spent occupied, in percent
    pub fn utilization_pct(&self, segment: usize, horizon: Seconds) -> f64 {
        if horizon <= 0.0 {
            return 0.0;
        }
        self.segments[segment].busy_time / horizon * 100.0
    }

    /// Time-weighted occupancy histogram for a segment
    pub fn occupancy_histogram(&self, segment: usize) -> &BTreeMap<u32, f64> {
        &self.segments[segment].occupancy_histogram
    }

    /// Completed crossings on a segment
    pub fn completed_crossings(&self, segment: usize) -> u64 {
        self.segments[segment].completed_crossings
    }

    /// Cumulative time-weighted mean queue length, summed over all streams
    ///
    /// The summary statistic driving adaptive convergence: cheap to compute,
    /// covers every stream, and stabilizes if and only if the queues do.
    pub fn mean_queue_length(&self) -> f64 {
        if self.last_time <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .streams
            .iter()
            .flat_map(|s| s.histogram.iter())
            .map(|(&len, &duration)| len as f64 * duration)
            .sum();
        weighted / self.last_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> StatsCollector {
        StatsCollector::new(2, 1, 3600.0)
    }

    #[test]
    fn test_histogram_accumulates_old_lengths() {
        let mut c = collector();
        // Queue 0 held length 0 for 10s, then length 1 for 5s
        c.observe(10.0, &[0, 0], &[0]);
        c.observe(15.0, &[1, 0], &[1]);

        assert_eq!(c.queue_histogram(0).get(&0), Some(&10.0));
        assert_eq!(c.queue_histogram(0).get(&1), Some(&5.0));
        assert_eq!(c.histogram_total(0), 15.0);
        assert_eq!(c.histogram_total(1), 15.0);
    }

    #[test]
    fn test_zero_length_interval_is_noop() {
        let mut c = collector();
        c.observe(10.0, &[2, 0], &[0]);
        let before = c.queue_histogram(0).clone();
        c.observe(10.0, &[5, 5], &[0]);
        assert_eq!(&before, c.queue_histogram(0));
    }

    #[test]
    fn test_busy_time_and_utilization() {
        let mut c = collector();
        c.observe(30.0, &[0, 0], &[1]);
        c.observe(100.0, &[0, 0], &[0]);
        assert!((c.utilization_pct(0, 100.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_finalize_flushes_and_is_idempotent() {
        let mut c = collector();
        c.observe(10.0, &[0, 0], &[0]);
        c.finalize(100.0, &[3, 0], &[0]);
        assert_eq!(c.queue_histogram(0).get(&3), Some(&90.0));
        assert_eq!(c.histogram_total(0), 100.0);

        // Second call must not double-count the final interval
        c.finalize(100.0, &[3, 0], &[0]);
        assert_eq!(c.histogram_total(0), 100.0);
    }

    #[test]
    fn test_window_max_spans_quiet_windows() {
        let mut c = collector();
        // Length 2 in effect from t=0 to t=2h: both windows see max 2
        c.observe(2.0 * 3600.0, &[2, 0], &[0]);
        c.finalize(3.0 * 3600.0, &[0, 0], &[0]);

        let counts = c.window_max_counts(0, 3);
        assert_eq!(counts.get(&2), Some(&2));
        // Third window saw only zeros (padding covers it either way)
        assert_eq!(counts.get(&0), Some(&1));
    }

    #[test]
    fn test_percentile_walk() {
        let mut c = collector();
        c.observe(90.0, &[0, 0], &[0]); // 90s at length 0
        c.observe(100.0, &[4, 0], &[0]); // 10s at length 4

        assert_eq!(c.percentile(0, 50.0, 99), 0);
        assert_eq!(c.percentile(0, 90.0, 99), 0);
        assert_eq!(c.percentile(0, 95.0, 99), 4);
        assert_eq!(c.percentile(0, 100.0, 99), 4);
    }

    #[test]
    fn test_percentile_empty_histogram_returns_default() {
        let c = collector();
        assert_eq!(c.percentile(0, 50.0, 7), 7);
    }

    #[test]
    fn test_wait_summary() {
        let mut c = collector();
        assert_eq!(c.wait_summary(0), (0, 0.0));
        c.record_wait(0, 2.0);
        c.record_wait(0, 4.0);
        assert_eq!(c.wait_summary(0), (2, 3.0));
    }

    #[test]
    fn test_mean_queue_length() {
        let mut c = collector();
        // Stream 0: length 1 for the full 100s. Stream 1: length 0 throughout.
        c.observe(100.0, &[1, 0], &[0]);
        assert!((c.mean_queue_length() - 1.0).abs() < 1e-9);
    }
}
