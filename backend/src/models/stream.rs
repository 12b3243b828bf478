//! Directional demand streams
//!
//! A stream is one directional source of demand on a segment ("A→B traffic",
//! "entry queue"). It owns a FIFO queue of arrival timestamps for entities
//! that have arrived but not yet been admitted onto the segment. The queue
//! deliberately excludes whoever is currently crossing: waiting and
//! occupancy are tracked as separate quantities.

use crate::core::time::Seconds;
use crate::models::segment::SegmentId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Travel direction over an exclusive segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AToB,
    BToA,
}

impl Direction {
    /// The opposing direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::AToB => Direction::BToA,
            Direction::BToA => Direction::AToB,
        }
    }
}

/// Index of a stream in the run's stream table
///
/// Stream order is configuration order, which doubles as the stable priority
/// order for arbitration tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub usize);

/// Runtime state of one directional demand stream
#[derive(Debug, Clone)]
pub struct Stream {
    id: StreamId,
    name: String,
    direction: Direction,
    segment: SegmentId,

    /// Arrival timestamps of entities waiting for admission, FIFO
    pending: VecDeque<Seconds>,

    /// Cumulative arrivals over the whole run
    total_arrivals: u64,

    /// Arrivals that occurred while the segment was serving this stream's
    /// own direction / the opposing direction (diagnostic counters)
    arrivals_while_same_serving: u64,
    arrivals_while_opposite_serving: u64,
}

impl Stream {
    pub fn new(id: StreamId, name: String, direction: Direction, segment: SegmentId) -> Self {
        Self {
            id,
            name,
            direction,
            segment,
            pending: VecDeque::new(),
            total_arrivals: 0,
            arrivals_while_same_serving: 0,
            arrivals_while_opposite_serving: 0,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    /// Enqueue an arrival at `time`
    pub fn push_arrival(&mut self, time: Seconds) {
        self.pending.push_back(time);
        self.total_arrivals += 1;
    }

    /// Arrival timestamp of the entity at the head of the queue
    pub fn head_arrival(&self) -> Option<Seconds> {
        self.pending.front().copied()
    }

    /// Remove and return the head entity's arrival timestamp
    pub fn pop_head(&mut self) -> Option<Seconds> {
        self.pending.pop_front()
    }

    /// Number of entities waiting (excludes anyone currently crossing)
    pub fn queue_len(&self) -> usize {
        self.pending.len()
    }

    pub fn total_arrivals(&self) -> u64 {
        self.total_arrivals
    }

    /// Count an arrival that landed while the segment was busy
    pub fn note_arrival_while_serving(&mut self, serving: Direction) {
        if serving == self.direction {
            self.arrivals_while_same_serving += 1;
        } else {
            self.arrivals_while_opposite_serving += 1;
        }
    }

    pub fn arrivals_while_same_serving(&self) -> u64 {
        self.arrivals_while_same_serving
    }

    pub fn arrivals_while_opposite_serving(&self) -> u64 {
        self.arrivals_while_opposite_serving
    }
}
