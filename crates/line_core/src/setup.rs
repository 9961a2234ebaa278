//! Seed collections and initial-state construction.
//!
//! Seeds refer to each other by string key; `build_line` validates them and
//! assigns arena ids in declaration order.

use ahash::{AHashMap, AHashSet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    Bin, BinId, ConfigError, Constants, Counters, Item, ItemId, LineState, MetaState, Station,
    StationId, Tray, TrayId, Worker, WorkerId,
};

/// Largest capacity whose positions fit the two-digit serial field.
pub const MAX_TRAY_CAPACITY: u32 = 99;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineSeed {
    pub items: Vec<ItemSeed>,
    pub workers: Vec<WorkerSeed>,
    pub stations: Vec<StationSeed>,
    pub bins: Vec<BinSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSeed {
    pub key: String,
    pub name: String,
    pub default_stock_level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSeed {
    pub key: String,
    pub name: String,
    pub efficiency: f64,
    pub defect_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSeed {
    pub key: String,
    pub name: String,
    pub worker: String,
    /// Defaults to one jittered unit duration for the assigned worker.
    #[serde(default)]
    pub initial_countdown: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinSeed {
    pub item: String,
    pub station: String,
    /// Defaults to the item's default stock level.
    #[serde(default)]
    pub stock_level: Option<i64>,
}

pub fn validate_constants(constants: &Constants) -> Result<(), ConfigError> {
    if constants.tray_capacity == 0 {
        return Err(ConfigError::NonPositiveTrayCapacity);
    }
    if constants.tray_capacity > MAX_TRAY_CAPACITY {
        return Err(ConfigError::TrayCapacityTooLarge {
            capacity: constants.tray_capacity,
            max: MAX_TRAY_CAPACITY,
        });
    }
    let positive_fields = [
        ("time_stretch", constants.time_stretch),
        ("restock_time_stretch", constants.restock_time_stretch),
        ("completion_tick_secs", constants.completion_tick_secs),
        ("restock_period_secs", constants.restock_period_secs),
        ("base_completion_duration", constants.base_completion_duration),
    ];
    for (field, value) in positive_fields {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::NonPositive { field, value });
        }
    }
    if !(0.0..1.0).contains(&constants.completion_jitter) {
        return Err(ConfigError::JitterOutOfRange(constants.completion_jitter));
    }
    let prefix = &constants.serial_prefix;
    if prefix.len() != 2 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidSerialPrefix(prefix.clone()));
    }
    Ok(())
}

fn stock_level(what: &'static str, key: &str, level: i64) -> Result<u32, ConfigError> {
    if level < 0 {
        return Err(ConfigError::NegativeStock {
            what,
            key: key.to_string(),
            level,
        });
    }
    u32::try_from(level).map_err(|_| ConfigError::StockOutOfRange {
        what,
        key: key.to_string(),
        level,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn arena_index(position: usize) -> u32 {
    position as u32
}

fn index_keys<'a>(
    what: &'static str,
    keys: impl Iterator<Item = &'a str>,
) -> Result<AHashMap<&'a str, u32>, ConfigError> {
    let mut index = AHashMap::new();
    for (position, key) in keys.enumerate() {
        if index.insert(key, arena_index(position)).is_some() {
            return Err(ConfigError::DuplicateKey {
                what,
                key: key.to_string(),
            });
        }
    }
    Ok(index)
}

/// Initial countdown for a station: one unit duration scaled by the worker's
/// efficiency and a jitter draw.
pub(crate) fn unit_duration(constants: &Constants, efficiency: f64, rng: &mut impl Rng) -> f64 {
    let jitter = if constants.completion_jitter > 0.0 {
        rng.gen_range(1.0 - constants.completion_jitter..=1.0 + constants.completion_jitter)
    } else {
        1.0
    };
    constants.base_completion_duration * efficiency * jitter
}

/// Validate `seed` against `constants` and build the line at activation zero.
///
/// Creates every item, worker, station and bin, plus the first tray (ordinal 1).
pub fn build_line(
    seed: &LineSeed,
    constants: &Constants,
    rng_seed: u64,
    content_version: &str,
    rng: &mut impl Rng,
) -> Result<LineState, ConfigError> {
    validate_constants(constants)?;

    let item_index = index_keys("item", seed.items.iter().map(|i| i.key.as_str()))?;
    let worker_index = index_keys("worker", seed.workers.iter().map(|w| w.key.as_str()))?;
    let station_index = index_keys("station", seed.stations.iter().map(|s| s.key.as_str()))?;

    let mut items = Vec::with_capacity(seed.items.len());
    for (idx, item) in seed.items.iter().enumerate() {
        items.push(Item {
            id: ItemId(arena_index(idx)),
            key: item.key.clone(),
            name: item.name.clone(),
            default_stock_level: stock_level("item", &item.key, item.default_stock_level)?,
        });
    }

    let mut workers = Vec::with_capacity(seed.workers.len());
    for (idx, worker) in seed.workers.iter().enumerate() {
        if !worker.efficiency.is_finite() || worker.efficiency <= 0.0 {
            return Err(ConfigError::NonPositiveEfficiency {
                key: worker.key.clone(),
                efficiency: worker.efficiency,
            });
        }
        if !(0.0..=100.0).contains(&worker.defect_rate) {
            return Err(ConfigError::DefectRateOutOfRange {
                key: worker.key.clone(),
                defect_rate: worker.defect_rate,
            });
        }
        workers.push(Worker {
            id: WorkerId(arena_index(idx)),
            key: worker.key.clone(),
            name: worker.name.clone(),
            efficiency: worker.efficiency,
            defect_rate: worker.defect_rate,
        });
    }

    let mut stations = Vec::with_capacity(seed.stations.len());
    for (idx, station) in seed.stations.iter().enumerate() {
        let Some(&worker_idx) = worker_index.get(station.worker.as_str()) else {
            return Err(ConfigError::UnknownWorker {
                station: station.key.clone(),
                worker: station.worker.clone(),
            });
        };
        let efficiency = workers[worker_idx as usize].efficiency;
        let countdown = match station.initial_countdown {
            Some(countdown) if countdown.is_finite() => countdown,
            Some(countdown) => {
                return Err(ConfigError::NonFiniteCountdown {
                    station: station.key.clone(),
                    countdown,
                })
            }
            None => unit_duration(constants, efficiency, rng),
        };
        stations.push(Station {
            id: StationId(arena_index(idx)),
            key: station.key.clone(),
            name: station.name.clone(),
            worker_id: WorkerId(worker_idx),
            countdown,
            bins: SmallVec::new(),
        });
    }

    let mut seen_pairs: AHashSet<(u32, u32)> = AHashSet::new();
    let mut bins = Vec::with_capacity(seed.bins.len());
    for (idx, bin) in seed.bins.iter().enumerate() {
        let Some(&item_idx) = item_index.get(bin.item.as_str()) else {
            return Err(ConfigError::UnknownItem(bin.item.clone()));
        };
        let Some(&station_idx) = station_index.get(bin.station.as_str()) else {
            return Err(ConfigError::UnknownStation(bin.station.clone()));
        };
        if !seen_pairs.insert((item_idx, station_idx)) {
            return Err(ConfigError::DuplicateBin {
                item: bin.item.clone(),
                station: bin.station.clone(),
            });
        }
        let level = match bin.stock_level {
            Some(level) => {
                let key = format!("{}@{}", bin.item, bin.station);
                stock_level("bin", &key, level)?
            }
            None => items[item_idx as usize].default_stock_level,
        };
        let bin_id = BinId(arena_index(idx));
        bins.push(Bin {
            id: bin_id,
            item_id: ItemId(item_idx),
            station_id: StationId(station_idx),
            stock_level: level,
            currently_replacing: false,
        });
        stations[station_idx as usize].bins.push(bin_id);
    }

    if let Some(bare) = stations.iter().find(|s| s.bins.is_empty()) {
        return Err(ConfigError::StationWithoutBins(bare.key.clone()));
    }

    Ok(LineState {
        meta: MetaState {
            tick: 0,
            restock_activations: 0,
            production_activations: 0,
            sim_time_secs: 0.0,
            seed: rng_seed,
            schema_version: 1,
            content_version: content_version.to_string(),
        },
        items,
        workers,
        stations,
        bins,
        trays: vec![Tray {
            id: TrayId(0),
            ordinal: 1,
            capacity: constants.tray_capacity,
            lamp_count: 0,
        }],
        lamps: Vec::new(),
        current_tray: TrayId(0),
        counters: Counters {
            next_event_id: 0,
            next_tray_ordinal: 2,
        },
    })
}
