//! Core primitives: the simulation clock and window indexing

pub mod time;

pub use time::{window_index, Seconds, SimClock};
