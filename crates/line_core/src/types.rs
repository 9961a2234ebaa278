//! Type definitions for `line_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

/// Arena ids: the wrapped value is the entity's index in its `LineState` vector.
macro_rules! arena_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "_{:04}"), self.0)
            }
        }
    };
}

arena_id!(ItemId, "item");
arena_id!(WorkerId, "worker");
arena_id!(StationId, "station");
arena_id!(BinId, "bin");
arena_id!(TrayId, "tray");

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

/// The two recurring activations driven by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Restock,
    Production,
}

/// Derived from the countdown; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStatus {
    /// Countdown > 0.
    Working,
    /// Countdown <= 0. Completes on the next production activation that finds
    /// every bin of the station stocked; stays here while any bin is empty.
    DueForCompletion,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineState {
    pub meta: MetaState,
    pub items: Vec<Item>,
    pub workers: Vec<Worker>,
    pub stations: Vec<Station>,
    pub bins: Vec<Bin>,
    pub trays: Vec<Tray>,
    pub lamps: Vec<Lamp>,
    /// The only tray accepting lamps. Maintained by the packer.
    pub current_tray: TrayId,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    /// Activations of either cycle so far. Event envelopes are stamped with it.
    pub tick: u64,
    pub restock_activations: u64,
    pub production_activations: u64,
    /// Simulated seconds elapsed on the production timeline.
    pub sim_time_secs: f64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    /// Ordinal handed to the next tray the packer opens.
    pub next_tray_ordinal: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub key: String,
    pub name: String,
    pub default_stock_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub key: String,
    pub name: String,
    /// Duration multiplier. 1.0 is baseline, below 1.0 is faster.
    pub efficiency: f64,
    /// Percentage in [0, 100].
    pub defect_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub key: String,
    pub name: String,
    pub worker_id: WorkerId,
    /// Simulated seconds until the unit in progress completes. Signed: overshoot
    /// below zero carries into the next re-arm.
    pub countdown: f64,
    pub bins: SmallVec<[BinId; 4]>,
}

impl Station {
    pub fn status(&self) -> StationStatus {
        if self.countdown > 0.0 {
            StationStatus::Working
        } else {
            StationStatus::DueForCompletion
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub id: BinId,
    pub item_id: ItemId,
    pub station_id: StationId,
    pub stock_level: u32,
    /// A restock request is in flight.
    pub currently_replacing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tray {
    pub id: TrayId,
    /// 1-based; encoded into every serial packed in this tray.
    pub ordinal: u32,
    pub capacity: u32,
    pub lamp_count: u32,
}

impl Tray {
    pub fn is_full(&self) -> bool {
        self.lamp_count >= self.capacity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lamp {
    pub serial: String,
    pub tray_id: TrayId,
    /// 1-based position within the tray.
    pub position: u32,
    pub station_id: StationId,
    pub defected: bool,
    pub produced_at_secs: f64,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    RestockFulfilled {
        bin_id: BinId,
        station_id: StationId,
        stock_level: u32,
    },
    RestockRequested {
        bin_id: BinId,
        station_id: StationId,
        stock_level: u32,
    },
    LampProduced {
        serial: String,
        station_id: StationId,
        tray_id: TrayId,
        defected: bool,
    },
    TrayOpened {
        tray_id: TrayId,
        ordinal: u32,
    },
    TrayFilled {
        tray_id: TrayId,
        ordinal: u32,
    },
    /// Only emitted at `EventLevel::Debug`.
    DefectRoll {
        station_id: StationId,
        defect_rate: f64,
        rolled: f64,
    },
    /// Only emitted at `EventLevel::Debug`, once per production activation the
    /// station spends blocked on an empty bin.
    StationStalled {
        station_id: StationId,
        empty_bins: Vec<BinId>,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Simulated seconds per real second on the production timeline.
    pub time_stretch: f64,
    /// Speed multiplier for the runner's restock round trip.
    pub restock_time_stretch: f64,
    /// Real seconds between production activations.
    pub completion_tick_secs: f64,
    /// Simulated seconds between restock activations (the runner round trip).
    pub restock_period_secs: f64,
    /// Bins whose stock drops below this are flagged for restock.
    pub low_stock_threshold: u32,
    pub tray_capacity: u32,
    /// Simulated seconds one unit takes a baseline worker.
    pub base_completion_duration: f64,
    /// Half-width of the uniform jitter band around 1.0.
    pub completion_jitter: f64,
    /// Two uppercase letters leading every serial.
    pub serial_prefix: String,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            time_stretch: 1.0,
            restock_time_stretch: 1.0,
            completion_tick_secs: 1.0,
            restock_period_secs: 300.0,
            low_stock_threshold: 5,
            tray_capacity: 60,
            base_completion_duration: 60.0,
            completion_jitter: 0.1,
            serial_prefix: "LM".to_string(),
        }
    }
}

impl Constants {
    /// Simulated seconds each production activation takes off a countdown.
    pub fn production_step_secs(&self) -> f64 {
        self.completion_tick_secs * self.time_stretch
    }

    /// Real seconds between production activations.
    pub fn production_interval_secs(&self) -> f64 {
        self.completion_tick_secs
    }

    /// Real seconds between restock activations.
    pub fn restock_interval_secs(&self) -> f64 {
        self.restock_period_secs / self.restock_time_stretch
    }
}
