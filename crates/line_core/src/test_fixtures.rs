//! Shared test fixtures for `line_core` and downstream crates.
//!
//! `base_constants()` uses zero jitter and a 60-second production step, so a
//! baseline worker finishes exactly one lamp per production activation.
//! `base_seed()` is one station with two bins fed by a baseline worker.

use crate::{
    build_line, BinSeed, Constants, ItemSeed, LineSeed, LineState, StationSeed, WorkerSeed,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub fn base_constants() -> Constants {
    Constants {
        time_stretch: 60.0,
        restock_time_stretch: 1.0,
        completion_tick_secs: 1.0,
        restock_period_secs: 300.0,
        low_stock_threshold: 5,
        tray_capacity: 60,
        base_completion_duration: 60.0,
        completion_jitter: 0.0,
        serial_prefix: "LM".to_string(),
    }
}

pub fn item(key: &str, default_stock_level: i64) -> ItemSeed {
    ItemSeed {
        key: key.to_string(),
        name: key.to_string(),
        default_stock_level,
    }
}

pub fn worker(key: &str, efficiency: f64, defect_rate: f64) -> WorkerSeed {
    WorkerSeed {
        key: key.to_string(),
        name: key.to_string(),
        efficiency,
        defect_rate,
    }
}

pub fn station(key: &str, worker: &str, initial_countdown: f64) -> StationSeed {
    StationSeed {
        key: key.to_string(),
        name: key.to_string(),
        worker: worker.to_string(),
        initial_countdown: Some(initial_countdown),
    }
}

pub fn bin(item: &str, station: &str, stock_level: Option<i64>) -> BinSeed {
    BinSeed {
        item: item.to_string(),
        station: station.to_string(),
        stock_level,
    }
}

/// Glass and socket bins at one station, 20 units each, worker never defects.
pub fn base_seed() -> LineSeed {
    LineSeed {
        items: vec![item("glass", 20), item("socket", 20)],
        workers: vec![worker("baseline", 1.0, 0.0)],
        stations: vec![station("assembly_1", "baseline", 60.0)],
        bins: vec![
            bin("glass", "assembly_1", None),
            bin("socket", "assembly_1", None),
        ],
    }
}

/// Build a line from `seed`, panicking on configuration errors.
pub fn base_state(seed: &LineSeed, constants: &Constants) -> LineState {
    let mut rng = make_rng();
    build_line(seed, constants, 42, "test", &mut rng).expect("fixture seed is valid")
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
