//! Non-interactive simulation runner
//!
//! Reads a JSON configuration file, runs the simulation, and prints the
//! report as JSON on stdout. Front-ends (web servers, notebooks, scripts)
//! invoke this binary and parse its output; it never prompts and never
//! plots.
//!
//! ```text
//! traffic-sim CONFIG.json [SEED]
//! traffic-sim --batch CONFIG.json [BASE_SEED]
//! ```
//!
//! `--batch` runs the configuration's `repetitions` on consecutive seeds in
//! parallel and prints the aggregate report instead of a single run's.

use std::process::ExitCode;

use traffic_simulator_core_rs::orchestrator::{aggregate, run, run_repetitions, SimulationConfig};

const DEFAULT_SEED: u64 = 1;

fn usage() -> ExitCode {
    eprintln!("usage: traffic-sim [--batch] CONFIG.json [SEED]");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let batch = args.first().map(String::as_str) == Some("--batch");
    if batch {
        args.remove(0);
    }

    let Some(config_path) = args.first() else {
        return usage();
    };
    let seed = match args.get(1) {
        None => DEFAULT_SEED,
        Some(raw) => match raw.parse::<u64>() {
            Ok(seed) => seed,
            Err(_) => {
                eprintln!("error: seed must be an unsigned integer, got '{raw}'");
                return usage();
            }
        },
    };
    if args.len() > 2 {
        return usage();
    }

    let config_text = match std::fs::read_to_string(config_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read {config_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let config: SimulationConfig = match serde_json::from_str(&config_text) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let output = if batch {
        run_repetitions(&config, seed)
            .map_err(|e| e.to_string())
            .and_then(|runs| {
                aggregate(&runs).ok_or_else(|| "empty batch".to_string())
            })
            .and_then(|report| serde_json::to_string_pretty(&report).map_err(|e| e.to_string()))
    } else {
        run(&config, seed)
            .map_err(|e| e.to_string())
            .and_then(|report| serde_json::to_string_pretty(&report).map_err(|e| e.to_string()))
    };

    match output {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
