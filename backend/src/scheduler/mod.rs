//! Event scheduler (future event list)
//!
//! The heart of the discrete-event engine: a priority queue of pending events
//! ordered by timestamp, with a monotonically increasing sequence number
//! breaking ties. The sequence tie-break matters more than it looks: two
//! arrivals can land on the exact same floating-point instant, and replay
//! determinism requires that they always pop in insertion order.
//!
//! Runs routinely schedule millions of events, so insert and extract are the
//! hot path: both are O(log n) on a binary heap.
//!
//! # Example
//!
//! ```
//! use traffic_simulator_core_rs::scheduler::{EventKind, EventQueue};
//! use traffic_simulator_core_rs::models::StreamId;
//!
//! let mut queue = EventQueue::new();
//! queue.schedule(2.0, EventKind::Arrival { stream: StreamId(0) }).unwrap();
//! queue.schedule(1.0, EventKind::Arrival { stream: StreamId(1) }).unwrap();
//!
//! let first = queue.pop_next().unwrap();
//! assert_eq!(first.time, 1.0);
//! ```

use crate::core::time::Seconds;
use crate::error::SimulationError;
use crate::models::{SegmentId, StreamId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// What a scheduled event does when dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new entity joins the stream's pending queue
    Arrival { stream: StreamId },

    /// An entity finishes crossing the segment
    ServiceComplete { segment: SegmentId },

    /// The segment controller re-runs arbitration (clearance expiry or
    /// follow-up headway expiry); revalidated at fire time
    ControllerRecheck { segment: SegmentId },
}

/// An event owned by the scheduler until popped
///
/// Immutable once created. Ordered by `time`, ties broken by `sequence`
/// (insertion order).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: Seconds,
    pub kind: EventKind,
    /// Insertion order, unique per queue
    pub sequence: u64,
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earliest time first; equal times pop in insertion order.
        // Times are validated finite at scheduling, so total_cmp agrees with
        // the usual < on every value that can reach the heap.
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-ordered future event list
///
/// `pop_next` returns events in non-decreasing time order. Scheduling an
/// event earlier than the last popped time is a [`SimulationError::CausalityViolation`]:
/// it can only happen if a handler is buggy, and it would silently corrupt
/// every downstream statistic if allowed through.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<std::cmp::Reverse<Event>>,
    /// Timestamp of the most recently popped event
    watermark: Seconds,
    /// Next sequence number to assign
    next_sequence: u64,
}

impl EventQueue {
    /// Create an empty queue with the watermark at time zero
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            watermark: 0.0,
            next_sequence: 0,
        }
    }

    /// Insert an event at `time`
    ///
    /// Fails with `CausalityViolation` if `time` precedes the last popped
    /// event, or if `time` is not a finite number.
    pub fn schedule(&mut self, time: Seconds, kind: EventKind) -> Result<(), SimulationError> {
        if !time.is_finite() {
            return Err(SimulationError::CausalityViolation {
                now: self.watermark,
                event_time: time,
                detail: format!("non-finite event time for {:?}", kind),
            });
        }
        if time < self.watermark {
            return Err(SimulationError::CausalityViolation {
                now: self.watermark,
                event_time: time,
                detail: format!("{:?} scheduled in the past", kind),
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(std::cmp::Reverse(Event {
            time,
            kind,
            sequence,
        }));
        Ok(())
    }

    /// Remove and return the earliest event, or `None` when the queue is empty
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.heap.pop().map(|r| r.0)?;
        self.watermark = event.time;
        Some(event)
    }

    /// True when no events are pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Timestamp of the most recently popped event
    pub fn watermark(&self) -> Seconds {
        self.watermark
    }
}
