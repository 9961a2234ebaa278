//! Lamp packing: tray assignment and serial numbers.

use crate::{Constants, Event, EventEnvelope, Lamp, LineState, StationId, Tray, TrayId};

/// Serial for the lamp at 1-based `position` in the tray with `ordinal`:
/// prefix, six-digit tray ordinal, two-digit position.
pub fn serial_number(prefix: &str, ordinal: u32, position: u32) -> String {
    format!("{prefix}{ordinal:06}{position:02}")
}

/// Opens the next tray and makes it current.
fn open_tray(state: &mut LineState, constants: &Constants, events: &mut Vec<EventEnvelope>) {
    #[allow(clippy::cast_possible_truncation)]
    let id = TrayId(state.trays.len() as u32);
    let ordinal = state.counters.next_tray_ordinal;
    state.counters.next_tray_ordinal += 1;
    state.trays.push(Tray {
        id,
        ordinal,
        capacity: constants.tray_capacity,
        lamp_count: 0,
    });
    state.current_tray = id;

    let tick = state.meta.tick;
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::TrayOpened {
            tray_id: id,
            ordinal,
        },
    ));
}

/// Pack a freshly produced lamp into the current tray and record it.
///
/// A full current tray is replaced by a new one first, so the lamp always
/// lands in a tray with room. Returns the lamp's serial.
pub(crate) fn pack_lamp(
    state: &mut LineState,
    constants: &Constants,
    station_id: StationId,
    defected: bool,
    events: &mut Vec<EventEnvelope>,
) -> String {
    let needs_tray = state.active_tray().map_or(true, Tray::is_full);
    if needs_tray {
        open_tray(state, constants, events);
    }

    let tray_id = state.current_tray;
    let tray = &mut state.trays[tray_id.index()];
    tray.lamp_count += 1;
    let position = tray.lamp_count;
    let ordinal = tray.ordinal;
    let filled = tray.is_full();

    let serial = serial_number(&constants.serial_prefix, ordinal, position);
    state.lamps.push(Lamp {
        serial: serial.clone(),
        tray_id,
        position,
        station_id,
        defected,
        produced_at_secs: state.meta.sim_time_secs,
    });

    let tick = state.meta.tick;
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::LampProduced {
            serial: serial.clone(),
            station_id,
            tray_id,
            defected,
        },
    ));
    if filled {
        events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::TrayFilled { tray_id, ordinal },
        ));
    }
    serial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_constants, base_seed, base_state};

    #[test]
    fn serial_is_fixed_width() {
        assert_eq!(serial_number("LM", 1, 1), "LM00000101");
        assert_eq!(serial_number("LM", 42, 60), "LM00004260");
        assert_eq!(serial_number("QX", 999_999, 99).len(), 10);
    }

    #[test]
    fn fills_current_tray_before_opening_next() {
        let constants = Constants {
            tray_capacity: 3,
            ..base_constants()
        };
        let mut state = base_state(&base_seed(), &constants);
        let mut events = Vec::new();

        let serials: Vec<String> = (0..4)
            .map(|_| pack_lamp(&mut state, &constants, StationId(0), false, &mut events))
            .collect();

        assert_eq!(
            serials,
            vec!["LM00000101", "LM00000102", "LM00000103", "LM00000201"]
        );
        assert_eq!(state.trays.len(), 2);
        assert_eq!(state.trays[0].lamp_count, 3);
        assert_eq!(state.trays[1].lamp_count, 1);
        assert_eq!(state.current_tray, TrayId(1));

        let opened = events
            .iter()
            .filter(|e| matches!(e.event, Event::TrayOpened { .. }))
            .count();
        let filled = events
            .iter()
            .filter(|e| matches!(e.event, Event::TrayFilled { .. }))
            .count();
        assert_eq!(opened, 1);
        assert_eq!(filled, 1);
    }

    #[test]
    fn full_tray_is_not_replaced_until_next_lamp() {
        let constants = Constants {
            tray_capacity: 1,
            ..base_constants()
        };
        let mut state = base_state(&base_seed(), &constants);
        let mut events = Vec::new();

        pack_lamp(&mut state, &constants, StationId(0), true, &mut events);
        assert_eq!(state.trays.len(), 1, "filling a tray does not open the next");
        assert!(state.trays[0].is_full());

        pack_lamp(&mut state, &constants, StationId(0), false, &mut events);
        assert_eq!(state.trays.len(), 2);
        assert_eq!(state.lamps[1].tray_id, TrayId(1));
        assert_eq!(state.lamps[1].position, 1);
        assert!(state.lamps[0].defected);
    }
}
