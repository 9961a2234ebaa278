//! Production activation: countdowns, completions, defect rolls, re-arming.

use rand::Rng;

use crate::{BinId, Constants, Event, EventEnvelope, EventLevel, LineState, StationId};

/// A completion decided during planning. Every random draw happens while
/// planning; committing is infallible.
struct Completion {
    station_id: StationId,
    defected: bool,
    rearm_secs: f64,
}

struct ProductionPlan {
    /// New countdown for every station, in station order.
    countdowns: Vec<f64>,
    completions: Vec<Completion>,
    stalled: Vec<(StationId, Vec<BinId>)>,
    rolls: Vec<(StationId, f64, f64)>,
}

fn plan(state: &LineState, constants: &Constants, rng: &mut impl Rng) -> ProductionPlan {
    let step = constants.production_step_secs();
    let mut countdowns = Vec::with_capacity(state.stations.len());
    let mut completions = Vec::new();
    let mut stalled = Vec::new();
    let mut rolls = Vec::new();

    for station in &state.stations {
        // Blocked stations (already <= 0) keep their countdown untouched.
        let countdown = if station.countdown > 0.0 {
            station.countdown - step
        } else {
            station.countdown
        };
        countdowns.push(countdown);

        if countdown > 0.0 {
            continue;
        }

        let empty_bins: Vec<BinId> = state
            .bins_for_station(station.id)
            .filter(|b| b.stock_level == 0)
            .map(|b| b.id)
            .collect();
        if !empty_bins.is_empty() {
            stalled.push((station.id, empty_bins));
            continue;
        }

        let Some(worker) = state.worker(station.worker_id) else {
            continue;
        };

        // Strictly below the rate: a roll equal to it is not a defect.
        let rolled: f64 = rng.gen_range(0.0..100.0);
        let defected = rolled < worker.defect_rate;
        rolls.push((station.id, worker.defect_rate, rolled));

        let rearm_secs = crate::setup::unit_duration(constants, worker.efficiency, rng);
        completions.push(Completion {
            station_id: station.id,
            defected,
            rearm_secs,
        });
    }

    ProductionPlan {
        countdowns,
        completions,
        stalled,
        rolls,
    }
}

/// One production activation.
///
/// Order of operations:
/// 1. Every station with countdown > 0 loses one production step of simulated
///    time. The result may go negative; stations already at or below zero are
///    left alone.
/// 2. Every station now at or below zero whose bins all hold stock completes
///    one unit, in station order:
///    a. each of its bins gives up exactly one unit;
///    b. a uniform roll in [0, 100) below the worker's defect rate marks the
///       lamp defective;
///    c. the lamp is packed into the current tray;
///    d. the countdown is re-armed by adding `base × efficiency × jitter`, so
///       overshoot carries forward.
///    Stations with an empty bin stay due and are not re-armed.
pub(crate) fn run_production_cycle(
    state: &mut LineState,
    constants: &Constants,
    rng: &mut impl Rng,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let plan = plan(state, constants, rng);

    for (station, countdown) in state.stations.iter_mut().zip(&plan.countdowns) {
        station.countdown = *countdown;
    }
    state.meta.sim_time_secs += constants.production_step_secs();
    let tick = state.meta.tick;

    if event_level == EventLevel::Debug {
        for (station_id, defect_rate, rolled) in plan.rolls {
            events.push(crate::emit(
                &mut state.counters,
                tick,
                Event::DefectRoll {
                    station_id,
                    defect_rate,
                    rolled,
                },
            ));
        }
        for (station_id, empty_bins) in plan.stalled {
            events.push(crate::emit(
                &mut state.counters,
                tick,
                Event::StationStalled {
                    station_id,
                    empty_bins,
                },
            ));
        }
    }

    for completion in plan.completions {
        let station_idx = completion.station_id.index();
        let bin_ids = state.stations[station_idx].bins.clone();
        for bin_id in bin_ids {
            let bin = &mut state.bins[bin_id.index()];
            debug_assert!(bin.stock_level >= 1, "planned completion on an empty bin");
            bin.stock_level = bin.stock_level.saturating_sub(1);
        }

        crate::packer::pack_lamp(
            state,
            constants,
            completion.station_id,
            completion.defected,
            events,
        );

        state.stations[station_idx].countdown += completion.rearm_secs;
    }
}
