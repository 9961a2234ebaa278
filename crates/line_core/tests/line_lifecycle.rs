use std::collections::{HashMap, HashSet};

use line_core::test_fixtures::{base_constants, bin, item, make_rng, station, worker};
use line_core::{
    build_line, step, Activation, BinId, Clock, Constants, Event, EventLevel, LineSeed, LineState,
    StationId,
};

fn mixed_line() -> LineSeed {
    LineSeed {
        items: vec![item("glass", 12), item("socket", 9), item("filament", 15)],
        workers: vec![
            worker("veteran", 0.8, 1.0),
            worker("baseline", 1.0, 5.0),
            worker("trainee", 1.4, 20.0),
        ],
        stations: vec![
            station("assembly_1", "veteran", 45.0),
            station("assembly_2", "baseline", 60.0),
            station("assembly_3", "trainee", 90.0),
        ],
        bins: vec![
            bin("glass", "assembly_1", None),
            bin("socket", "assembly_1", None),
            bin("glass", "assembly_2", None),
            bin("filament", "assembly_2", Some(2)),
            bin("glass", "assembly_3", None),
            bin("socket", "assembly_3", None),
            bin("filament", "assembly_3", None),
        ],
    }
}

fn constants() -> Constants {
    Constants {
        time_stretch: 20.0,
        restock_period_secs: 4.0,
        tray_capacity: 25,
        completion_jitter: 0.1,
        ..base_constants()
    }
}

fn build(seed: &LineSeed, constants: &Constants) -> LineState {
    let mut rng = make_rng();
    build_line(seed, constants, 42, "test", &mut rng).unwrap()
}

#[test]
fn invariants_hold_over_a_long_run() {
    let constants = constants();
    let mut state = build(&mixed_line(), &constants);
    let mut rng = make_rng();
    let mut clock = Clock::new(&constants);

    // Bins flagged on the previous restock activation, still awaiting refill.
    let mut awaiting: HashSet<BinId> = HashSet::new();

    while clock.productions_fired() < 2_000 {
        let activation = clock.advance();
        let before = state.clone();
        let events = step(&mut state, activation, &constants, &mut rng, EventLevel::Normal);

        match activation {
            Activation::Restock => {
                let fulfilled: HashSet<BinId> = events
                    .iter()
                    .filter_map(|e| match e.event {
                        Event::RestockFulfilled { bin_id, .. } => Some(bin_id),
                        _ => None,
                    })
                    .collect();
                assert_eq!(fulfilled, awaiting, "requests are fulfilled exactly one activation later");
                awaiting = events
                    .iter()
                    .filter_map(|e| match e.event {
                        Event::RestockRequested { bin_id, .. } => Some(bin_id),
                        _ => None,
                    })
                    .collect();
                for bin_id in &awaiting {
                    assert!(state.bins[bin_id.index()].currently_replacing);
                }
            }
            Activation::Production => {
                let produced: HashMap<StationId, usize> =
                    events.iter().fold(HashMap::new(), |mut acc, e| {
                        if let Event::LampProduced { station_id, .. } = e.event {
                            *acc.entry(station_id).or_default() += 1;
                        }
                        acc
                    });
                for (old, new) in before.stations.iter().zip(&state.stations) {
                    let completed = produced.get(&new.id).copied().unwrap_or(0);
                    assert!(completed <= 1);
                    for bin_id in &new.bins {
                        let consumed = before.bins[bin_id.index()].stock_level
                            - state.bins[bin_id.index()].stock_level;
                        assert_eq!(consumed as usize, completed);
                    }
                    if completed == 0 && old.countdown <= 0.0 {
                        assert!(
                            (old.countdown - new.countdown).abs() < 1e-12,
                            "blocked station countdown moved"
                        );
                    }
                }
            }
        }

        for tray in &state.trays {
            assert!(tray.lamp_count <= tray.capacity);
        }
        let open_trays = state.trays.iter().filter(|t| !t.is_full()).count();
        assert!(open_trays <= 1, "only the current tray may have room");
    }

    let serials: HashSet<&str> = state.lamps.iter().map(|l| l.serial.as_str()).collect();
    assert_eq!(serials.len(), state.lamps.len(), "serials are unique");
    assert!(state.lamps.len() > 100, "line produced {} lamps", state.lamps.len());
    assert!(state.lamps.iter().any(|l| l.defected));
}

#[test]
fn faster_time_stretch_raises_throughput_per_activation() {
    let slow = Constants {
        time_stretch: 10.0,
        ..constants()
    };
    let fast = Constants {
        time_stretch: 30.0,
        ..constants()
    };

    let lamps_after = |constants: &Constants| {
        let mut state = build(&mixed_line(), constants);
        let mut rng = make_rng();
        let mut clock = Clock::new(constants);
        while clock.productions_fired() < 300 {
            let activation = clock.advance();
            step(&mut state, activation, constants, &mut rng, EventLevel::Normal);
        }
        state.lamps.len()
    };

    assert!(lamps_after(&fast) > lamps_after(&slow));
}
