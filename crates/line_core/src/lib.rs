//! `line_core`: deterministic kanban line simulation.
//!
//! No IO, no network. All randomness via the passed-in Rng.

mod clock;
mod engine;
mod error;
pub mod metrics;
mod packer;
mod production;
mod replenish;
mod setup;
mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;

pub use clock::Clock;
pub use engine::{production_tick, restock_tick, step};
pub use error::ConfigError;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use packer::serial_number;
pub use setup::{
    build_line, validate_constants, BinSeed, ItemSeed, LineSeed, StationSeed, WorkerSeed,
    MAX_TRAY_CAPACITY,
};
pub use store::{list_bins, list_lamps, list_stations, list_trays, BinView, StationView, TrayView};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
