use super::*;

fn two_station_seed() -> LineSeed {
    LineSeed {
        items: vec![item("glass", 100)],
        workers: vec![worker("baseline", 1.0, 0.0)],
        stations: vec![
            station("assembly_1", "baseline", 60.0),
            station("assembly_2", "baseline", 60.0),
        ],
        bins: vec![
            bin("glass", "assembly_1", None),
            bin("glass", "assembly_2", None),
        ],
    }
}

#[test]
fn stations_share_the_current_tray_in_station_order() {
    let constants = base_constants();
    let mut state = base_state(&two_station_seed(), &constants);
    let mut rng = make_rng();

    run_production(&mut state, &constants, &mut rng, 2);

    let packed: Vec<(StationId, u32)> = state
        .lamps
        .iter()
        .map(|l| (l.station_id, l.position))
        .collect();
    assert_eq!(
        packed,
        vec![
            (StationId(0), 1),
            (StationId(1), 2),
            (StationId(0), 3),
            (StationId(1), 4),
        ]
    );
    assert_eq!(state.trays[0].lamp_count, 4);
}

#[test]
fn small_trays_overflow_one_at_a_time() {
    let constants = Constants {
        tray_capacity: 4,
        ..base_constants()
    };
    let mut state = base_state(&two_station_seed(), &constants);
    let mut rng = make_rng();

    let events = run_production(&mut state, &constants, &mut rng, 5);

    assert_eq!(state.lamps.len(), 10);
    assert_eq!(state.trays.len(), 3);
    let counts: Vec<u32> = state.trays.iter().map(|t| t.lamp_count).collect();
    assert_eq!(counts, vec![4, 4, 2]);
    assert_eq!(state.current_tray, TrayId(2));
    assert_eq!(
        count_events(&events, |e| matches!(e, Event::TrayOpened { .. })),
        2
    );
    for tray in &state.trays {
        assert_eq!(
            state.lamps_in_tray(tray.id).count(),
            tray.lamp_count as usize
        );
    }
}

#[test]
fn serials_strictly_increase_in_creation_order() {
    let constants = Constants {
        tray_capacity: 7,
        ..base_constants()
    };
    let mut state = base_state(&two_station_seed(), &constants);
    let mut rng = make_rng();

    run_production(&mut state, &constants, &mut rng, 20);

    // Fixed width, so lexical order is numeric order.
    for pair in state.lamps.windows(2) {
        assert!(
            pair[0].serial < pair[1].serial,
            "{} !< {}",
            pair[0].serial,
            pair[1].serial
        );
    }
    assert!(state.lamps.iter().all(|l| l.serial.len() == 10));
}
