//! Domain types for the simulation

pub mod event;
pub mod segment;
pub mod stream;

pub use event::{EventLog, TraceEvent};
pub use segment::{SegmentId, SegmentTiming};
pub use stream::{Direction, Stream, StreamId};
