//! Read access to `LineState`: lookups by id and by relationship, plus the
//! flattened list views handed to outer callers.

use serde::Serialize;

use crate::{
    Bin, BinId, Item, ItemId, Lamp, LineState, Station, StationId, StationStatus, Tray, TrayId,
    Worker, WorkerId,
};

impl LineState {
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(id.index())
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.index())
    }

    pub fn bin(&self, id: BinId) -> Option<&Bin> {
        self.bins.get(id.index())
    }

    pub fn tray(&self, id: TrayId) -> Option<&Tray> {
        self.trays.get(id.index())
    }

    /// The tray currently accepting lamps.
    pub fn active_tray(&self) -> Option<&Tray> {
        self.tray(self.current_tray)
    }

    pub fn worker_for_station(&self, id: StationId) -> Option<&Worker> {
        self.station(id).and_then(|s| self.worker(s.worker_id))
    }

    pub fn bins_for_station(&self, id: StationId) -> impl Iterator<Item = &Bin> + '_ {
        self.station(id)
            .into_iter()
            .flat_map(|s| s.bins.iter())
            .filter_map(|bin_id| self.bin(*bin_id))
    }

    pub fn item_for_bin(&self, id: BinId) -> Option<&Item> {
        self.bin(id).and_then(|b| self.item(b.item_id))
    }

    /// True when every bin feeding the station holds at least one unit.
    pub fn station_has_stock(&self, id: StationId) -> bool {
        self.bins_for_station(id).all(|b| b.stock_level >= 1)
    }

    pub fn lamps_in_tray(&self, id: TrayId) -> impl Iterator<Item = &Lamp> + '_ {
        self.lamps.iter().filter(move |l| l.tray_id == id)
    }

    pub fn lamps_for_station(&self, id: StationId) -> impl Iterator<Item = &Lamp> + '_ {
        self.lamps.iter().filter(move |l| l.station_id == id)
    }
}

// ---------------------------------------------------------------------------
// List views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BinView {
    pub id: BinId,
    pub item: String,
    pub station: String,
    pub stock_level: u32,
    pub default_stock_level: u32,
    pub currently_replacing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub id: StationId,
    pub key: String,
    pub name: String,
    pub worker: String,
    pub countdown: f64,
    pub status: StationStatus,
    /// Due for completion but at least one bin is empty.
    pub starved: bool,
    pub lamps_produced: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrayView {
    pub id: TrayId,
    pub ordinal: u32,
    pub capacity: u32,
    pub lamp_count: u32,
    pub fill_pct: f64,
    pub current: bool,
}

pub fn list_bins(state: &LineState) -> Vec<BinView> {
    state
        .bins
        .iter()
        .map(|bin| {
            let item = state.item(bin.item_id);
            BinView {
                id: bin.id,
                item: item.map(|i| i.key.clone()).unwrap_or_default(),
                station: state
                    .station(bin.station_id)
                    .map(|s| s.key.clone())
                    .unwrap_or_default(),
                stock_level: bin.stock_level,
                default_stock_level: item.map_or(0, |i| i.default_stock_level),
                currently_replacing: bin.currently_replacing,
            }
        })
        .collect()
}

pub fn list_stations(state: &LineState) -> Vec<StationView> {
    state
        .stations
        .iter()
        .map(|station| {
            let status = station.status();
            StationView {
                id: station.id,
                key: station.key.clone(),
                name: station.name.clone(),
                worker: state
                    .worker(station.worker_id)
                    .map(|w| w.key.clone())
                    .unwrap_or_default(),
                countdown: station.countdown,
                status,
                starved: status == StationStatus::DueForCompletion
                    && !state.station_has_stock(station.id),
                lamps_produced: state.lamps_for_station(station.id).count(),
            }
        })
        .collect()
}

pub fn list_trays(state: &LineState) -> Vec<TrayView> {
    state
        .trays
        .iter()
        .map(|tray| TrayView {
            id: tray.id,
            ordinal: tray.ordinal,
            capacity: tray.capacity,
            lamp_count: tray.lamp_count,
            fill_pct: f64::from(tray.lamp_count) / f64::from(tray.capacity.max(1)),
            current: tray.id == state.current_tray,
        })
        .collect()
}

pub fn list_lamps(state: &LineState) -> &[Lamp] {
    &state.lamps
}
