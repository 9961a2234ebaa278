//! Restock activation: the runner's pull loop.

use crate::{BinId, Constants, Event, EventEnvelope, LineState};

struct BinUpdate {
    bin_id: BinId,
    stock_level: u32,
    currently_replacing: bool,
    fulfilled: bool,
    requested: bool,
}

/// One restock activation.
///
/// Order of operations (both against the state as it was when the
/// activation began, applied together at the end):
/// 1. Fulfil: every bin with a request in flight is reset to its item's
///    default stock level and the request clears.
/// 2. Request: every bin whose stock, after step 1, is below
///    `low_stock_threshold` gets a request raised.
///
/// A request raised here is therefore fulfilled on the next activation, never
/// this one.
pub(crate) fn run_restock_cycle(
    state: &mut LineState,
    constants: &Constants,
    events: &mut Vec<EventEnvelope>,
) {
    let mut updates = Vec::new();
    for bin in &state.bins {
        let mut stock_level = bin.stock_level;
        let mut currently_replacing = bin.currently_replacing;
        let mut fulfilled = false;
        if currently_replacing {
            if let Some(item) = state.item(bin.item_id) {
                stock_level = item.default_stock_level;
            }
            currently_replacing = false;
            fulfilled = true;
        }

        let requested = stock_level < constants.low_stock_threshold;
        if requested {
            currently_replacing = true;
        }

        if fulfilled || requested {
            updates.push(BinUpdate {
                bin_id: bin.id,
                stock_level,
                currently_replacing,
                fulfilled,
                requested,
            });
        }
    }

    let tick = state.meta.tick;
    for update in updates {
        let bin = &mut state.bins[update.bin_id.index()];
        bin.stock_level = update.stock_level;
        bin.currently_replacing = update.currently_replacing;
        let station_id = bin.station_id;

        if update.fulfilled {
            events.push(crate::emit(
                &mut state.counters,
                tick,
                Event::RestockFulfilled {
                    bin_id: update.bin_id,
                    station_id,
                    stock_level: update.stock_level,
                },
            ));
        }
        if update.requested {
            events.push(crate::emit(
                &mut state.counters,
                tick,
                Event::RestockRequested {
                    bin_id: update.bin_id,
                    station_id,
                    stock_level: update.stock_level,
                },
            ));
        }
    }
}
