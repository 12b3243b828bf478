//! Quantitative scenario validation
//!
//! These pin the simulator against closed-form expectations for regimes
//! where queueing theory gives usable answers: light symmetric traffic,
//! one-sided demand, and the approach to saturation.

use traffic_simulator_core_rs::{
    aggregate, run_repetitions, ArrivalConfig, Direction, SegmentConfig, SimulationConfig,
    StopRule, StreamConfig,
};

fn one_lane(rate_a: f64, rate_b: f64, crossing: f64, horizon: f64) -> SimulationConfig {
    SimulationConfig {
        segments: vec![SegmentConfig {
            name: "lane".to_string(),
            crossing_duration: crossing,
            switch_over: 0.0,
            follow_up_headway: 0.0,
            streams: vec![
                StreamConfig {
                    name: "a_to_b".to_string(),
                    direction: Direction::AToB,
                    arrivals: ArrivalConfig {
                        rate_per_hour: rate_a,
                        min_headway: 0.0,
                    },
                },
                StreamConfig {
                    name: "b_to_a".to_string(),
                    direction: Direction::BToA,
                    arrivals: ArrivalConfig {
                        rate_per_hour: rate_b,
                        min_headway: 0.0,
                    },
                },
            ],
        }],
        stop: StopRule::FixedHorizon { horizon },
        stats_window: 3600.0,
        trace_enabled: false,
        repetitions: 1,
    }
}

/// Crossing 5.4s, both streams 15/h, 1000 hours: utilization ≈
/// 2 × (15/3600) × 5.4 ≈ 4.5%, waits near zero (light traffic).
#[test]
fn test_symmetric_light_traffic_utilization() {
    let config = one_lane(15.0, 15.0, 5.4, 1000.0 * 3600.0);
    let report = traffic_simulator_core_rs::run(&config, 42).unwrap();

    let util = report.segments[0].utilization_pct;
    assert!(
        (util - 4.5).abs() < 0.5,
        "utilization {util}% too far from 4.5%"
    );
    // Little's law pins the occupancy figure at 2λτ = 0.045
    assert!(
        (report.segments[0].mean_occupancy - 0.045).abs() < 0.005,
        "mean occupancy {} too far from 0.045",
        report.segments[0].mean_occupancy
    );

    // M/D/1-like bound on the combined stream: Wq = ρ·τ / 2(1−ρ) ≈ 0.13s
    for stream in &report.streams {
        assert!(
            stream.mean_wait < 0.5,
            "stream {} mean wait {}s, expected near zero",
            stream.name,
            stream.mean_wait
        );
    }

    // Roughly 15 arrivals/hour per stream
    for stream in &report.streams {
        let per_hour = stream.total_arrivals as f64 / 1000.0;
        assert!(
            (per_hour - 15.0).abs() < 1.0,
            "stream {} saw {per_hour} arrivals/hour",
            stream.name
        );
    }
}

/// One silent stream: no contention is possible, so the active stream never
/// queues and utilization is (R/3600) × τ.
#[test]
fn test_one_sided_demand_never_queues() {
    let rate = 120.0;
    let crossing = 6.0;
    let config = one_lane(rate, 0.0, crossing, 500.0 * 3600.0);
    let report = traffic_simulator_core_rs::run(&config, 7).unwrap();

    let active = &report.streams[0];
    assert_eq!(active.wait_count, active.total_arrivals);
    assert!(
        active.mean_wait.abs() < 1e-9,
        "uncontended mean wait {}s",
        active.mean_wait
    );
    assert_eq!(active.arrivals_while_opposite_serving, 0);

    // Little's law: mean occupancy = (R/3600) × τ, exactly in expectation
    let expected = rate / 3600.0 * crossing;
    let occupancy = report.segments[0].mean_occupancy;
    assert!(
        (occupancy - expected).abs() < 0.01,
        "mean occupancy {occupancy} too far from {expected}"
    );

    // The busy-time share sits just under the linear figure because
    // same-direction crossings overlap: 1 − e^(−λτ) vs λτ.
    let util = report.segments[0].utilization_pct;
    assert!(
        util < expected * 100.0 && util > expected * 100.0 - 2.5,
        "utilization {util}% implausible for λτ = {expected}"
    );
}

/// Queueing pressure rises monotonically as λτ approaches saturation.
#[test]
fn test_queueing_grows_toward_saturation() {
    let mut mean_waits = Vec::new();
    for rate in [50.0, 150.0, 300.0] {
        let config = one_lane(rate, rate, 5.4, 1000.0 * 3600.0);
        let report = traffic_simulator_core_rs::run(&config, 11).unwrap();
        let mean_wait = (report.streams[0].mean_wait + report.streams[1].mean_wait) / 2.0;
        mean_waits.push(mean_wait);
    }

    assert!(
        mean_waits[0] < mean_waits[1] && mean_waits[1] < mean_waits[2],
        "mean waits not monotone: {:?}",
        mean_waits
    );
}

/// Switch-over time adds to effective service and pushes utilization and
/// waits up under contention.
#[test]
fn test_switch_over_increases_waits() {
    let base = one_lane(200.0, 200.0, 5.4, 500.0 * 3600.0);
    let without = traffic_simulator_core_rs::run(&base, 13).unwrap();

    let mut with_clearance = base.clone();
    with_clearance.segments[0].switch_over = 4.0;
    let with = traffic_simulator_core_rs::run(&with_clearance, 13).unwrap();

    let wait_without = without.streams[0].mean_wait + without.streams[1].mean_wait;
    let wait_with = with.streams[0].mean_wait + with.streams[1].mean_wait;
    assert!(
        wait_with > wait_without,
        "clearance {wait_with}s not above {wait_without}s"
    );
}

/// Monte-Carlo averaging tightens the utilization estimate around the
/// analytic value.
#[test]
fn test_monte_carlo_utilization_average() {
    let mut config = one_lane(15.0, 15.0, 5.4, 200.0 * 3600.0);
    config.repetitions = 8;

    let runs = run_repetitions(&config, 1).unwrap();
    let agg = aggregate(&runs).unwrap();

    assert_eq!(agg.repetitions, 8);
    assert!(
        (agg.segments[0].mean_utilization_pct - 4.5).abs() < 0.4,
        "averaged utilization {}%",
        agg.segments[0].mean_utilization_pct
    );
    // Two crossings per admission-pair: ~30 crossings per hour total
    assert!((agg.segments[0].mean_crossings_per_hour - 30.0).abs() < 2.0);
}

/// Independent sub-segments do not interact: a chain of two segments gives
/// each its own controller and statistics.
#[test]
fn test_independent_segments_in_one_run() {
    let mut config = one_lane(15.0, 15.0, 5.4, 100.0 * 3600.0);
    let mut second = config.segments[0].clone();
    second.name = "upper_lane".to_string();
    second.crossing_duration = 10.8;
    for stream in &mut second.streams {
        stream.name = format!("upper_{}", stream.name);
    }
    config.segments.push(second);

    let report = traffic_simulator_core_rs::run(&config, 3).unwrap();
    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.streams.len(), 4);

    // Twice the crossing time, same demand: roughly double the utilization
    let lower = report.segments[0].utilization_pct;
    let upper = report.segments[1].utilization_pct;
    assert!(
        upper > lower * 1.5,
        "upper {upper}% vs lower {lower}%"
    );
}
