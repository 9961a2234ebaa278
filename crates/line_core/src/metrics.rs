//! Snapshot metrics computed from `LineState`.
//!
//! A single `compute_metrics(&LineState) -> MetricsSnapshot` function samples
//! the current state for time-series analysis. No state mutation, no IO.
//! `MetricsFileWriter` is the one IO helper, used by the runners.

use crate::{LineState, StationStatus};
use serde::Serialize;
use std::io::Write;

/// Current schema version. Bump when fields are added, removed or reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,
    pub restock_activations: u64,
    pub production_activations: u64,
    pub sim_time_secs: f64,

    // Output
    pub lamps_total: u32,
    pub lamps_defected: u32,
    pub defect_pct: f64,
    pub lamps_per_sim_hour: f64,
    pub trays_total: u32,
    pub current_tray_fill: u32,

    // Inventory
    pub bins_total: u32,
    pub bins_low: u32,
    pub bins_replacing: u32,
    pub bins_empty: u32,
    pub total_stock_units: u64,

    // Stations
    pub stations_working: u32,
    pub stations_due: u32,
    pub stations_starved: u32,
}

#[allow(clippy::cast_possible_truncation)]
fn count<T>(items: impl Iterator<Item = T>) -> u32 {
    items.count() as u32
}

/// Sample the line. `low_stock_threshold` decides which bins count as low.
pub fn compute_metrics(state: &LineState, low_stock_threshold: u32) -> MetricsSnapshot {
    let lamps_total = count(state.lamps.iter());
    let lamps_defected = count(state.lamps.iter().filter(|l| l.defected));
    let defect_pct = if lamps_total == 0 {
        0.0
    } else {
        f64::from(lamps_defected) * 100.0 / f64::from(lamps_total)
    };
    let sim_hours = state.meta.sim_time_secs / 3600.0;
    let lamps_per_sim_hour = if sim_hours > 0.0 {
        f64::from(lamps_total) / sim_hours
    } else {
        0.0
    };

    let mut stations_working = 0;
    let mut stations_due = 0;
    let mut stations_starved = 0;
    for station in &state.stations {
        match station.status() {
            StationStatus::Working => stations_working += 1,
            StationStatus::DueForCompletion => {
                stations_due += 1;
                if !state.station_has_stock(station.id) {
                    stations_starved += 1;
                }
            }
        }
    }

    MetricsSnapshot {
        tick: state.meta.tick,
        metrics_version: METRICS_VERSION,
        restock_activations: state.meta.restock_activations,
        production_activations: state.meta.production_activations,
        sim_time_secs: state.meta.sim_time_secs,
        lamps_total,
        lamps_defected,
        defect_pct,
        lamps_per_sim_hour,
        trays_total: count(state.trays.iter()),
        current_tray_fill: state.active_tray().map_or(0, |t| t.lamp_count),
        bins_total: count(state.bins.iter()),
        bins_low: count(
            state
                .bins
                .iter()
                .filter(|b| b.stock_level < low_stock_threshold),
        ),
        bins_replacing: count(state.bins.iter().filter(|b| b.currently_replacing)),
        bins_empty: count(state.bins.iter().filter(|b| b.stock_level == 0)),
        total_stock_units: state.bins.iter().map(|b| u64::from(b.stock_level)).sum(),
        stations_working,
        stations_due,
        stations_starved,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "tick,metrics_version,restock_activations,production_activations,sim_time_secs,\
         lamps_total,lamps_defected,defect_pct,lamps_per_sim_hour,trays_total,current_tray_fill,\
         bins_total,bins_low,bins_replacing,bins_empty,total_stock_units,\
         stations_working,stations_due,stations_starved"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.tick,
        snapshot.metrics_version,
        snapshot.restock_activations,
        snapshot.production_activations,
        snapshot.sim_time_secs,
        snapshot.lamps_total,
        snapshot.lamps_defected,
        snapshot.defect_pct,
        snapshot.lamps_per_sim_hour,
        snapshot.trays_total,
        snapshot.current_tray_fill,
        snapshot.bins_total,
        snapshot.bins_low,
        snapshot.bins_replacing,
        snapshot.bins_empty,
        snapshot.total_stock_units,
        snapshot.stations_working,
        snapshot.stations_due,
        snapshot.stations_starved,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Streams snapshots to `metrics_000.csv`, `metrics_001.csv`, ... in a run
/// directory, rotating after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_constants, base_seed, base_state};
    use crate::{Lamp, StationId, TrayId};

    fn lamp(defected: bool) -> Lamp {
        Lamp {
            serial: String::new(),
            tray_id: TrayId(0),
            position: 1,
            station_id: StationId(0),
            defected,
            produced_at_secs: 0.0,
        }
    }

    #[test]
    fn fresh_line_has_no_output() {
        let constants = base_constants();
        let state = base_state(&base_seed(), &constants);
        let snapshot = compute_metrics(&state, constants.low_stock_threshold);
        assert_eq!(snapshot.lamps_total, 0);
        assert!(snapshot.defect_pct.abs() < 1e-9);
        assert!(snapshot.lamps_per_sim_hour.abs() < 1e-9);
        assert_eq!(snapshot.trays_total, 1);
        assert_eq!(snapshot.bins_total, 2);
        assert_eq!(snapshot.stations_working, 1);
    }

    #[test]
    fn defect_pct_and_throughput() {
        let constants = base_constants();
        let mut state = base_state(&base_seed(), &constants);
        state.lamps = vec![lamp(true), lamp(false), lamp(false), lamp(false)];
        state.meta.sim_time_secs = 1800.0;
        let snapshot = compute_metrics(&state, constants.low_stock_threshold);
        assert!((snapshot.defect_pct - 25.0).abs() < 1e-9);
        assert!((snapshot.lamps_per_sim_hour - 8.0).abs() < 1e-9);
    }

    #[test]
    fn counts_low_empty_and_starved() {
        let constants = base_constants();
        let mut state = base_state(&base_seed(), &constants);
        state.bins[0].stock_level = 0;
        state.bins[1].stock_level = 3;
        state.bins[1].currently_replacing = true;
        state.stations[0].countdown = -1.0;
        let snapshot = compute_metrics(&state, constants.low_stock_threshold);
        assert_eq!(snapshot.bins_low, 2);
        assert_eq!(snapshot.bins_empty, 1);
        assert_eq!(snapshot.bins_replacing, 1);
        assert_eq!(snapshot.total_stock_units, 3);
        assert_eq!(snapshot.stations_due, 1);
        assert_eq!(snapshot.stations_starved, 1);
    }

    #[test]
    fn writer_emits_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let constants = base_constants();
        let state = base_state(&base_seed(), &constants);
        let snapshot = compute_metrics(&state, constants.low_stock_threshold);

        let mut writer = MetricsFileWriter::new(dir.path().to_path_buf()).unwrap();
        writer.write_row(&snapshot).unwrap();
        writer.write_row(&snapshot).unwrap();
        writer.flush().unwrap();

        let csv = std::fs::read_to_string(dir.path().join("metrics_000.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("tick,metrics_version"));
        assert_eq!(
            lines[0].split(',').count(),
            lines[1].split(',').count(),
            "header and row column counts match"
        );
    }
}
