//! Tests for the future event list
//!
//! The scheduler must hand back events in non-decreasing time order with
//! deterministic tie-breaks, and must refuse to travel backward in time.

use traffic_simulator_core_rs::{EventKind, EventQueue, RngManager, StreamId};

fn arrival(stream: usize) -> EventKind {
    EventKind::Arrival {
        stream: StreamId(stream),
    }
}

#[test]
fn test_many_random_inserts_pop_sorted() {
    let mut rng = RngManager::new(31415);
    let mut queue = EventQueue::new();

    for i in 0..10_000 {
        let time = rng.next_f64() * 1e6;
        queue.schedule(time, arrival(i % 4)).unwrap();
    }

    let mut last = f64::NEG_INFINITY;
    let mut popped = 0;
    while let Some(event) = queue.pop_next() {
        assert!(
            event.time >= last,
            "event at {} popped after {}",
            event.time,
            last
        );
        last = event.time;
        popped += 1;
    }
    assert_eq!(popped, 10_000);
}

#[test]
fn test_tie_break_is_insertion_order() {
    let mut queue = EventQueue::new();
    for i in 0..100 {
        queue.schedule(42.0, arrival(i)).unwrap();
    }

    let mut expected = 0;
    while let Some(event) = queue.pop_next() {
        match event.kind {
            EventKind::Arrival { stream } => assert_eq!(stream.0, expected),
            _ => unreachable!(),
        }
        expected += 1;
    }
}

#[test]
fn test_sequence_numbers_are_monotonic() {
    let mut queue = EventQueue::new();
    queue.schedule(5.0, arrival(0)).unwrap();
    queue.schedule(1.0, arrival(1)).unwrap();
    queue.schedule(3.0, arrival(2)).unwrap();

    // Sequence reflects insertion order, independent of pop order
    let sequences: Vec<u64> = std::iter::from_fn(|| queue.pop_next())
        .map(|e| e.sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 0]);
}

#[test]
fn test_interleaved_schedule_and_pop() {
    let mut queue = EventQueue::new();
    queue.schedule(1.0, arrival(0)).unwrap();
    queue.schedule(10.0, arrival(1)).unwrap();

    assert_eq!(queue.pop_next().unwrap().time, 1.0);

    // Still allowed: at or after the watermark
    queue.schedule(5.0, arrival(2)).unwrap();
    queue.schedule(1.0, arrival(3)).unwrap();

    let times: Vec<f64> = std::iter::from_fn(|| queue.pop_next())
        .map(|e| e.time)
        .collect();
    assert_eq!(times, vec![1.0, 5.0, 10.0]);
}

#[test]
fn test_past_scheduling_rejected_after_pop() {
    let mut queue = EventQueue::new();
    queue.schedule(100.0, arrival(0)).unwrap();
    queue.pop_next().unwrap();

    assert!(queue.schedule(99.0, arrival(1)).is_err());
    // The queue itself remains usable
    queue.schedule(100.0, arrival(2)).unwrap();
    assert_eq!(queue.len(), 1);
}
