//! Exclusive segments
//!
//! A segment is the scarce, spatially-extended resource under contention: a
//! single-lane road section, a parking lift, a narrow bridge. Only one
//! direction may occupy it at a time; after the last occupant leaves, a
//! switch-over (clearance) delay must elapse before the opposite direction
//! may start.

use crate::core::time::Seconds;

/// Index of a segment in the run's segment table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub usize);

/// Validated timing parameters of one exclusive segment
///
/// Produced from `SegmentConfig` during configuration validation; by the time
/// a `SegmentTiming` exists the durations are known finite, crossing time is
/// positive, and the delays are non-negative.
#[derive(Debug, Clone, Copy)]
pub struct SegmentTiming {
    /// Time one entity needs to cross the segment, seconds
    pub crossing_duration: Seconds,

    /// Clearance delay after the last occupant exits before the opposite
    /// direction may be admitted, seconds
    pub switch_over: Seconds,

    /// Minimum gap between consecutive same-direction admissions while the
    /// segment stays occupied, seconds
    pub follow_up_headway: Seconds,
}
