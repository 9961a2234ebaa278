use line_core::MetricsSnapshot;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub productions: u64,
    pub activations_total: u64,
    pub sim_time_secs: f64,
    pub wall_time_ms: u64,
    pub activations_per_second: f64,
    pub summary_metrics: Option<SummaryMetrics>,
    pub stall_occurred: bool,
    pub stall_reason: Option<String>,
    pub metrics_path: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
    pub lamps_total: u32,
    pub lamps_defected: u32,
    pub defect_pct: f64,
    pub lamps_per_sim_hour: f64,
    pub trays_total: u32,
    pub bins_low: u32,
    pub bins_empty: u32,
    pub total_stock_units: u64,
    pub stations_starved: u32,
}

impl SummaryMetrics {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            lamps_total: snapshot.lamps_total,
            lamps_defected: snapshot.lamps_defected,
            defect_pct: snapshot.defect_pct,
            lamps_per_sim_hour: snapshot.lamps_per_sim_hour,
            trays_total: snapshot.trays_total,
            bins_low: snapshot.bins_low,
            bins_empty: snapshot.bins_empty,
            total_stock_units: snapshot.total_stock_units,
            stations_starved: snapshot.stations_starved,
        }
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// A line has stalled when every station is waiting on an empty bin.
pub fn detect_stall(snapshot: &MetricsSnapshot) -> (bool, Option<String>) {
    let stations = snapshot.stations_working + snapshot.stations_due;
    if stations > 0 && snapshot.stations_starved == stations {
        (true, Some("all stations starved".to_string()))
    } else {
        (false, None)
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_core::test_fixtures::{base_constants, base_seed, base_state};

    fn sample_snapshot() -> MetricsSnapshot {
        let constants = base_constants();
        let mut state = base_state(&base_seed(), &constants);
        state.meta.sim_time_secs = 3600.0;
        let mut snapshot = line_core::compute_metrics(&state, constants.low_stock_threshold);
        snapshot.lamps_total = 120;
        snapshot.lamps_defected = 6;
        snapshot.defect_pct = 5.0;
        snapshot
    }

    fn sample_result(summary_metrics: Option<SummaryMetrics>) -> RunResult {
        RunResult {
            run_schema_version: 1,
            run_status: "completed".to_string(),
            run_id: "test-uuid".to_string(),
            git_sha: "abc123".to_string(),
            git_dirty: false,
            seed: 42,
            scenario_name: "test_scenario".to_string(),
            scenario_params: serde_json::json!({"productions": 1000}),
            productions: 1000,
            activations_total: 1200,
            sim_time_secs: 60_000.0,
            wall_time_ms: 50,
            activations_per_second: 24_000.0,
            summary_metrics,
            stall_occurred: false,
            stall_reason: None,
            metrics_path: "metrics_000.csv".to_string(),
            error_message: None,
        }
    }

    #[test]
    fn test_summary_metrics_from_snapshot() {
        let metrics = SummaryMetrics::from_snapshot(&sample_snapshot());
        assert_eq!(metrics.lamps_total, 120);
        assert_eq!(metrics.lamps_defected, 6);
        assert_eq!(metrics.trays_total, 1);
        assert_eq!(metrics.total_stock_units, 40);
    }

    #[test]
    fn test_run_result_serialization() {
        let result = sample_result(Some(SummaryMetrics::from_snapshot(&sample_snapshot())));
        let json = serde_json::to_string_pretty(&result).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
        assert_eq!(parsed["run_status"], "completed");
        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["summary_metrics"]["lamps_total"], 120);
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run_result.json");
        sample_result(None).write_atomic(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed["summary_metrics"].is_null());
    }

    #[test]
    fn test_stall_detection() {
        let mut snapshot = sample_snapshot();
        assert_eq!(detect_stall(&snapshot), (false, None));

        snapshot.stations_working = 0;
        snapshot.stations_due = 1;
        snapshot.stations_starved = 1;
        let (stalled, reason) = detect_stall(&snapshot);
        assert!(stalled);
        assert!(reason.is_some());
    }

    #[test]
    fn test_git_sha_not_empty() {
        assert!(!git_sha().is_empty());
    }
}
