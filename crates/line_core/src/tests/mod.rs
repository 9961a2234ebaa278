use super::*;
use crate::test_fixtures::{
    base_constants, base_seed, base_state, bin, item, make_rng, station, worker,
};
use rand_chacha::ChaCha8Rng;

mod packing;

// --- Shared test helpers ------------------------------------------------

/// Run `count` production activations, collecting every event.
fn run_production(
    state: &mut LineState,
    constants: &Constants,
    rng: &mut ChaCha8Rng,
    count: usize,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..count {
        events.extend(production_tick(state, constants, rng, EventLevel::Normal));
    }
    events
}

/// One station, one bin of `glass` starting at `stock`.
fn single_bin_seed(stock: i64, default_stock_level: i64) -> LineSeed {
    LineSeed {
        items: vec![item("glass", default_stock_level)],
        workers: vec![worker("baseline", 1.0, 0.0)],
        stations: vec![station("assembly_1", "baseline", 60.0)],
        bins: vec![bin("glass", "assembly_1", Some(stock))],
    }
}

fn count_events(events: &[EventEnvelope], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| predicate(&e.event)).count()
}

// --- Engine ---------------------------------------------------------------

#[test]
fn step_dispatches_and_counts_activations() {
    let constants = base_constants();
    let mut state = base_state(&base_seed(), &constants);
    let mut rng = make_rng();

    step(&mut state, Activation::Production, &constants, &mut rng, EventLevel::Normal);
    step(&mut state, Activation::Restock, &constants, &mut rng, EventLevel::Normal);
    step(&mut state, Activation::Production, &constants, &mut rng, EventLevel::Normal);

    assert_eq!(state.meta.tick, 3);
    assert_eq!(state.meta.production_activations, 2);
    assert_eq!(state.meta.restock_activations, 1);
    assert!((state.meta.sim_time_secs - 120.0).abs() < 1e-9);
    assert_eq!(state.lamps.len(), 2);
}

#[test]
fn events_carry_activation_tick_and_unique_ids() {
    let constants = base_constants();
    let mut state = base_state(&base_seed(), &constants);
    let mut rng = make_rng();

    let first = production_tick(&mut state, &constants, &mut rng, EventLevel::Normal);
    let second = production_tick(&mut state, &constants, &mut rng, EventLevel::Normal);

    assert!(first.iter().all(|e| e.tick == 0));
    assert!(second.iter().all(|e| e.tick == 1));
    let ids: std::collections::HashSet<_> =
        first.iter().chain(&second).map(|e| e.id.0.clone()).collect();
    assert_eq!(ids.len(), first.len() + second.len());
}

#[test]
fn same_seed_same_line() {
    let constants = Constants {
        completion_jitter: 0.1,
        restock_period_secs: 10.0,
        ..base_constants()
    };
    let seed = LineSeed {
        workers: vec![worker("baseline", 1.0, 30.0)],
        ..base_seed()
    };

    let run = || {
        let mut state = base_state(&seed, &constants);
        let mut rng = make_rng();
        let mut clock = Clock::new(&constants);
        while clock.productions_fired() < 200 {
            let activation = clock.advance();
            step(&mut state, activation, &constants, &mut rng, EventLevel::Normal);
        }
        state
    };

    let a = run();
    let b = run();
    let serials_a: Vec<_> = a.lamps.iter().map(|l| (&l.serial, l.defected)).collect();
    let serials_b: Vec<_> = b.lamps.iter().map(|l| (&l.serial, l.defected)).collect();
    assert_eq!(serials_a, serials_b);
    assert!((a.stations[0].countdown - b.stations[0].countdown).abs() < 1e-12);
}

#[test]
fn state_round_trips_through_json() {
    let constants = base_constants();
    let mut state = base_state(&base_seed(), &constants);
    let mut rng = make_rng();
    run_production(&mut state, &constants, &mut rng, 3);

    let json = serde_json::to_string(&state).unwrap();
    let loaded: LineState = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.lamps.len(), 3);
    assert_eq!(loaded.stations[0].bins.as_slice(), state.stations[0].bins.as_slice());
    assert_eq!(loaded.current_tray, state.current_tray);
}
