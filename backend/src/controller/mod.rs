//! Segment access controller
//!
//! The state machine that arbitrates time-shared access to one exclusive
//! segment. This is the most failure-prone logic in the repository: it must
//! guarantee that opposing directions never occupy the segment at the same
//! simulated instant, stay fair under unbounded run length, and remain
//! deterministic under simultaneous floating-point-equal arrivals.
//!
//! # State machine
//!
//! ```text
//!            arrival, queue non-empty
//!   Idle ─────────────────────────────► Serving(d, count ≥ 1)
//!    ▲                                     │           │
//!    │ recheck, both queues empty          │ same-direction admission,
//!    │                                     │ headway elapsed (count += 1)
//!    │        last occupant exits          ▼           │
//!   ClearanceWait ◄────────────────── Serving(d, count→0)
//!        │
//!        │ recheck after switch-over, some queue non-empty
//!        └──────────────────────────► Serving(d', count = 1)
//! ```
//!
//! Mutual exclusion is unrepresentable rather than checked: `Serving` holds a
//! single direction and a single occupant count, so "both directions on the
//! segment" has no encoding. The one place a conflicting admission could be
//! requested still returns [`SimulationError::MutualExclusionViolation`] with
//! a full state dump, and the test suite replays recorded traces to prove the
//! path is never taken.
//!
//! # Arbitration
//!
//! When the segment is free to admit, the winner is the head-of-queue entity
//! with the smallest arrival timestamp across all streams (global
//! first-come-first-served). Exact timestamp ties are broken by stream
//! configuration order (stable, never arbitrary) so simultaneous arrivals
//! replay identically.

use crate::core::time::Seconds;
use crate::error::SimulationError;
use crate::models::{Direction, EventLog, SegmentId, SegmentTiming, Stream, StreamId, TraceEvent};
use crate::scheduler::{EventKind, EventQueue};
use crate::stats::StatsCollector;

/// Access-control state of one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerState {
    /// No one queued, segment free
    Idle,

    /// One direction has exclusive access
    Serving {
        direction: Direction,
        /// Entities currently on the segment, ≥ 1
        on_segment: u32,
        /// Time of the most recent admission (gates follow-up headway)
        last_entry: Seconds,
    },

    /// Segment just vacated; waiting out the switch-over before
    /// re-arbitrating
    ClearanceWait {
        /// When arbitration re-runs
        until: Seconds,
    },
}

/// Controller for one exclusive segment
///
/// Owns no queues and no clock: it mutates the streams handed to it, records
/// into the statistics collector and trace, and emits follow-on scheduler
/// events. Time advancement stays with the driver.
#[derive(Debug, Clone)]
pub struct SegmentController {
    id: SegmentId,
    timing: SegmentTiming,
    /// Streams feeding this segment, in configuration (priority) order
    streams: Vec<StreamId>,
    state: ControllerState,
}

impl SegmentController {
    pub fn new(id: SegmentId, timing: SegmentTiming, streams: Vec<StreamId>) -> Self {
        Self {
            id,
            timing,
            streams,
            state: ControllerState::Idle,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Entities currently on the segment
    pub fn occupancy(&self) -> u32 {
        match self.state {
            ControllerState::Serving { on_segment, .. } => on_segment,
            _ => 0,
        }
    }

    /// Direction currently holding the segment, if any
    pub fn serving_direction(&self) -> Option<Direction> {
        match self.state {
            ControllerState::Serving { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Global-FCFS winner across this segment's queues
    ///
    /// Returns the stream whose head entity arrived earliest; exact ties go
    /// to the stream listed first in configuration order.
    fn arbitrate(&self, streams: &[Stream]) -> Option<StreamId> {
        let mut winner: Option<(Seconds, StreamId)> = None;
        for &sid in &self.streams {
            if let Some(head) = streams[sid.0].head_arrival() {
                match winner {
                    Some((best, _)) if best <= head => {}
                    _ => winner = Some((head, sid)),
                }
            }
        }
        winner.map(|(_, sid)| sid)
    }

    /// Handle an arrival on `stream_id` at `time`
    ///
    /// Enqueues the entity. From `Idle` this triggers arbitration at the same
    /// instant (no delay). While serving, a same-direction arrival that wins
    /// arbitration is admitted as a follower once the follow-up headway has
    /// elapsed; otherwise a recheck is scheduled for the moment it does.
    pub fn on_arrival(
        &mut self,
        time: Seconds,
        stream_id: StreamId,
        streams: &mut [Stream],
        scheduler: &mut EventQueue,
        stats: &mut StatsCollector,
        trace: &mut EventLog,
    ) -> Result<(), SimulationError> {
        let stream = &mut streams[stream_id.0];
        stream.push_arrival(time);
        if let ControllerState::Serving { direction, .. } = self.state {
            stream.note_arrival_while_serving(direction);
        }
        trace.log(TraceEvent::Arrival {
            time,
            stream: stream_id,
            queue_len_after: streams[stream_id.0].queue_len(),
        });

        match self.state {
            ControllerState::Idle => {
                // The queue was empty a moment ago, so the new arrival is the
                // arbitration winner by construction.
                let winner = self.arbitrate(streams).ok_or_else(|| {
                    SimulationError::CausalityViolation {
                        now: time,
                        event_time: time,
                        detail: format!(
                            "segment {} idle arbitration found no queued entity",
                            self.id.0
                        ),
                    }
                })?;
                self.admit(time, winner, streams, scheduler, stats, trace)
            }
            ControllerState::Serving {
                direction,
                last_entry,
                ..
            } => {
                if let Some(winner) = self.arbitrate(streams) {
                    if streams[winner.0].direction() == direction {
                        if time - last_entry >= self.timing.follow_up_headway {
                            return self.admit(time, winner, streams, scheduler, stats, trace);
                        }
                        scheduler.schedule(
                            last_entry + self.timing.follow_up_headway,
                            EventKind::ControllerRecheck { segment: self.id },
                        )?;
                    }
                }
                Ok(())
            }
            // Queued until the clearance recheck re-arbitrates.
            ControllerState::ClearanceWait { .. } => Ok(()),
        }
    }

    /// Handle one entity finishing its crossing at `time`
    pub fn on_service_complete(
        &mut self,
        time: Seconds,
        streams: &mut [Stream],
        scheduler: &mut EventQueue,
        stats: &mut StatsCollector,
        trace: &mut EventLog,
    ) -> Result<(), SimulationError> {
        match self.state {
            ControllerState::Serving {
                direction,
                on_segment,
                last_entry,
            } => {
                let remaining = on_segment - 1;
                stats.record_crossing(self.id.0);
                trace.log(TraceEvent::Exit {
                    time,
                    segment: self.id,
                    direction,
                    on_segment_after: remaining,
                });

                if remaining == 0 {
                    let until = time + self.timing.switch_over;
                    self.state = ControllerState::ClearanceWait { until };
                    trace.log(TraceEvent::ClearanceStart {
                        time,
                        segment: self.id,
                        until,
                    });
                    scheduler.schedule(until, EventKind::ControllerRecheck { segment: self.id })?;
                } else {
                    self.state = ControllerState::Serving {
                        direction,
                        on_segment: remaining,
                        last_entry,
                    };
                }
                Ok(())
            }
            _ => Err(SimulationError::CausalityViolation {
                now: time,
                event_time: time,
                detail: format!(
                    "service completion on segment {} with no occupant ({})",
                    self.id.0,
                    self.render_state(streams)
                ),
            }),
        }
    }

    /// Handle a recheck event at `time`
    ///
    /// Rechecks are revalidated at fire time: the conditions that motivated
    /// one may have changed by the time it pops, in which case it is ignored.
    /// A recheck firing during `ClearanceWait` before the clearance expiry is
    /// a leftover headway recheck from the previous serving phase and admits
    /// nothing.
    pub fn on_recheck(
        &mut self,
        time: Seconds,
        streams: &mut [Stream],
        scheduler: &mut EventQueue,
        stats: &mut StatsCollector,
        trace: &mut EventLog,
    ) -> Result<(), SimulationError> {
        match self.state {
            ControllerState::ClearanceWait { until } => {
                if time < until {
                    return Ok(());
                }
                match self.arbitrate(streams) {
                    Some(winner) => self.admit(time, winner, streams, scheduler, stats, trace),
                    None => {
                        self.state = ControllerState::Idle;
                        trace.log(TraceEvent::WentIdle {
                            time,
                            segment: self.id,
                        });
                        Ok(())
                    }
                }
            }
            ControllerState::Serving {
                direction,
                last_entry,
                ..
            } => {
                if let Some(winner) = self.arbitrate(streams) {
                    if streams[winner.0].direction() == direction
                        && time - last_entry >= self.timing.follow_up_headway
                    {
                        return self.admit(time, winner, streams, scheduler, stats, trace);
                    }
                }
                Ok(())
            }
            ControllerState::Idle => Ok(()),
        }
    }

    /// Admit the head entity of `winner` onto the segment at `time`
    ///
    /// Pops the queue head, records its wait, schedules its service
    /// completion, and transitions the state. When another same-direction
    /// entity is already waiting behind the admitted one, a follow-up recheck
    /// is scheduled one headway out so platoons drain one admission per
    /// event, deterministically.
    fn admit(
        &mut self,
        time: Seconds,
        winner: StreamId,
        streams: &mut [Stream],
        scheduler: &mut EventQueue,
        stats: &mut StatsCollector,
        trace: &mut EventLog,
    ) -> Result<(), SimulationError> {
        let direction = streams[winner.0].direction();

        let on_segment_after = match self.state {
            ControllerState::Idle | ControllerState::ClearanceWait { .. } => 1,
            ControllerState::Serving {
                direction: serving,
                on_segment,
                ..
            } => {
                if serving != direction {
                    return Err(SimulationError::MutualExclusionViolation {
                        segment: self.id.0,
                        time,
                        state_dump: self.render_state(streams),
                    });
                }
                on_segment + 1
            }
        };

        let arrival = streams[winner.0].pop_head().ok_or_else(|| {
            SimulationError::CausalityViolation {
                now: time,
                event_time: time,
                detail: format!(
                    "admission from empty queue on segment {} ({})",
                    self.id.0,
                    streams[winner.0].name()
                ),
            }
        })?;

        let wait = time - arrival;
        stats.record_wait(winner.0, wait);
        self.state = ControllerState::Serving {
            direction,
            on_segment: on_segment_after,
            last_entry: time,
        };
        trace.log(TraceEvent::Admission {
            time,
            segment: self.id,
            stream: winner,
            direction,
            wait,
            on_segment_after,
        });
        scheduler.schedule(
            time + self.timing.crossing_duration,
            EventKind::ServiceComplete { segment: self.id },
        )?;

        // Chain the next same-direction admission if one is already eligible.
        if let Some(next) = self.arbitrate(streams) {
            if streams[next.0].direction() == direction {
                scheduler.schedule(
                    time + self.timing.follow_up_headway,
                    EventKind::ControllerRecheck { segment: self.id },
                )?;
            }
        }

        Ok(())
    }

    /// Render the controller state and queue contents for a failure dump
    fn render_state(&self, streams: &[Stream]) -> String {
        let queues: Vec<String> = self
            .streams
            .iter()
            .map(|&sid| {
                let s = &streams[sid.0];
                format!(
                    "{}[{:?}] len={} head={:?}",
                    s.name(),
                    s.direction(),
                    s.queue_len(),
                    s.head_arrival()
                )
            })
            .collect();
        format!("state={:?}; queues: {}", self.state, queues.join(", "))
    }
}
