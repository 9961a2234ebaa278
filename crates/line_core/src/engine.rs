use rand::Rng;

use crate::{Activation, Constants, EventEnvelope, EventLevel, LineState};

/// Run one restock activation.
///
/// Returns all events produced by the activation.
pub fn restock_tick(state: &mut LineState, constants: &Constants) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    crate::replenish::run_restock_cycle(state, constants, &mut events);
    state.meta.restock_activations += 1;
    state.meta.tick += 1;
    events
}

/// Run one production activation.
///
/// Returns all events produced by the activation.
pub fn production_tick(
    state: &mut LineState,
    constants: &Constants,
    rng: &mut impl Rng,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    crate::production::run_production_cycle(state, constants, rng, event_level, &mut events);
    state.meta.production_activations += 1;
    state.meta.tick += 1;
    events
}

/// Advance the line by one activation of either cycle.
///
/// Every activation runs to completion before the caller can start another,
/// which is the only serialization the line needs.
pub fn step(
    state: &mut LineState,
    activation: Activation,
    constants: &Constants,
    rng: &mut impl Rng,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    match activation {
        Activation::Restock => restock_tick(state, constants),
        Activation::Production => production_tick(state, constants, rng, event_level),
    }
}
