//! Transition trace for replay and auditing
//!
//! The trace captures every controller state change during a run. It exists
//! so that correctness can be re-checked after the fact: replaying the
//! recorded transitions proves (or disproves) that opposing directions never
//! occupied a segment simultaneously, without trusting the controller that
//! produced them.
//!
//! Tracing is optional: a 1000-hour run produces hundreds of thousands of
//! transitions, so long production runs keep it off and tests turn it on.

use crate::core::time::Seconds;
use crate::models::segment::SegmentId;
use crate::models::stream::{Direction, StreamId};
use std::collections::HashMap;

/// One controller state change
///
/// All variants carry the simulated time at which the transition occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// An entity joined a stream's pending queue
    Arrival {
        time: Seconds,
        stream: StreamId,
        queue_len_after: usize,
    },

    /// An entity was admitted onto the segment
    Admission {
        time: Seconds,
        segment: SegmentId,
        stream: StreamId,
        direction: Direction,
        /// Admission time minus arrival time
        wait: Seconds,
        on_segment_after: u32,
    },

    /// An entity finished crossing and left the segment
    Exit {
        time: Seconds,
        segment: SegmentId,
        direction: Direction,
        on_segment_after: u32,
    },

    /// The segment emptied and entered its clearance wait
    ClearanceStart {
        time: Seconds,
        segment: SegmentId,
        /// When the clearance expires and arbitration re-runs
        until: Seconds,
    },

    /// Clearance expired with both queues empty
    WentIdle { time: Seconds, segment: SegmentId },
}

impl TraceEvent {
    /// Simulated time of this transition
    pub fn time(&self) -> Seconds {
        match self {
            TraceEvent::Arrival { time, .. } => *time,
            TraceEvent::Admission { time, .. } => *time,
            TraceEvent::Exit { time, .. } => *time,
            TraceEvent::ClearanceStart { time, .. } => *time,
            TraceEvent::WentIdle { time, .. } => *time,
        }
    }
}

/// Append-only transition log
///
/// When disabled, `log` is a no-op and the run carries no per-transition
/// memory overhead.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    enabled: bool,
    events: Vec<TraceEvent>,
}

impl EventLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append an event (no-op when tracing is disabled)
    pub fn log(&mut self, event: TraceEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Replay the trace and verify mutual exclusion held throughout
    ///
    /// Walks every recorded transition, tracking per-segment occupancy, and
    /// confirms that no admission ever landed while the opposite direction
    /// still had entities on the segment. Returns a description of the first
    /// violation found, if any.
    pub fn verify_mutual_exclusion(&self) -> Result<(), String> {
        // segment -> (direction currently on segment, occupant count)
        let mut occupancy: HashMap<SegmentId, (Direction, u32)> = HashMap::new();

        for event in &self.events {
            match *event {
                TraceEvent::Admission {
                    time,
                    segment,
                    direction,
                    on_segment_after,
                    ..
                } => {
                    let (serving, count) = occupancy.entry(segment).or_insert((direction, 0));
                    if *count > 0 && *serving != direction {
                        return Err(format!(
                            "t={}: admission of {:?} on segment {} while {} {:?} \
                             occupant(s) still crossing",
                            time, direction, segment.0, count, serving
                        ));
                    }
                    *serving = direction;
                    *count += 1;
                    if *count != on_segment_after {
                        return Err(format!(
                            "t={}: admission count mismatch on segment {} (replayed {}, \
                             recorded {})",
                            time, segment.0, count, on_segment_after
                        ));
                    }
                }
                TraceEvent::Exit {
                    time,
                    segment,
                    direction,
                    on_segment_after,
                } => match occupancy.get_mut(&segment) {
                    Some((serving, count)) if *count > 0 && *serving == direction => {
                        *count -= 1;
                        if *count != on_segment_after {
                            return Err(format!(
                                "t={}: exit count mismatch on segment {} (replayed {}, \
                                 recorded {})",
                                time, segment.0, count, on_segment_after
                            ));
                        }
                    }
                    _ => {
                        return Err(format!(
                            "t={}: exit of {:?} from segment {} with no matching occupant",
                            time, direction, segment.0
                        ));
                    }
                },
                TraceEvent::Arrival { .. }
                | TraceEvent::ClearanceStart { .. }
                | TraceEvent::WentIdle { .. } => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg() -> SegmentId {
        SegmentId(0)
    }

    #[test]
    fn test_disabled_log_records_nothing() {
        let mut log = EventLog::new(false);
        log.log(TraceEvent::WentIdle {
            time: 1.0,
            segment: seg(),
        });
        assert!(log.is_empty());
    }

    #[test]
    fn test_clean_trace_verifies() {
        let mut log = EventLog::new(true);
        log.log(TraceEvent::Admission {
            time: 1.0,
            segment: seg(),
            stream: StreamId(0),
            direction: Direction::AToB,
            wait: 0.0,
            on_segment_after: 1,
        });
        log.log(TraceEvent::Admission {
            time: 2.0,
            segment: seg(),
            stream: StreamId(0),
            direction: Direction::AToB,
            wait: 0.5,
            on_segment_after: 2,
        });
        log.log(TraceEvent::Exit {
            time: 6.4,
            segment: seg(),
            direction: Direction::AToB,
            on_segment_after: 1,
        });
        log.log(TraceEvent::Exit {
            time: 7.4,
            segment: seg(),
            direction: Direction::AToB,
            on_segment_after: 0,
        });
        log.log(TraceEvent::Admission {
            time: 9.0,
            segment: seg(),
            stream: StreamId(1),
            direction: Direction::BToA,
            wait: 3.1,
            on_segment_after: 1,
        });

        assert!(log.verify_mutual_exclusion().is_ok());
    }

    #[test]
    fn test_opposing_admission_detected() {
        let mut log = EventLog::new(true);
        log.log(TraceEvent::Admission {
            time: 1.0,
            segment: seg(),
            stream: StreamId(0),
            direction: Direction::AToB,
            wait: 0.0,
            on_segment_after: 1,
        });
        log.log(TraceEvent::Admission {
            time: 2.0,
            segment: seg(),
            stream: StreamId(1),
            direction: Direction::BToA,
            wait: 0.0,
            on_segment_after: 1,
        });

        let err = log.verify_mutual_exclusion().unwrap_err();
        assert!(err.contains("still crossing"), "unexpected message: {err}");
    }

    #[test]
    fn test_orphan_exit_detected() {
        let mut log = EventLog::new(true);
        log.log(TraceEvent::Exit {
            time: 1.0,
            segment: seg(),
            direction: Direction::AToB,
            on_segment_after: 0,
        });

        assert!(log.verify_mutual_exclusion().is_err());
    }
}
