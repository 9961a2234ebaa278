use line_core::MetricsSnapshot;
use serde::Serialize;

type Extractor = (&'static str, fn(&MetricsSnapshot) -> f64);

/// Metrics reported across seeds, in print order.
const EXTRACTORS: &[Extractor] = &[
    ("lamps_total", |s| f64::from(s.lamps_total)),
    ("lamps_per_sim_hour", |s| s.lamps_per_sim_hour),
    ("defect_pct", |s| s.defect_pct),
    ("trays_total", |s| f64::from(s.trays_total)),
    ("bins_low", |s| f64::from(s.bins_low)),
    ("bins_empty", |s| f64::from(s.bins_empty)),
    ("total_stock_units", |s| s.total_stock_units as f64),
    ("stations_starved", |s| f64::from(s.stations_starved)),
];

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub stalled_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(snapshots: &[(u64, &MetricsSnapshot)]) -> SummaryStats {
    let stalled_count = snapshots
        .iter()
        .filter(|(_, s)| crate::run_result::detect_stall(s).0)
        .count();

    let metrics = EXTRACTORS
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = snapshots.iter().map(|(_, s)| extract(s)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: snapshots.len(),
        stalled_count,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

/// `{ "metric": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
pub fn build_aggregated_metrics(stats: &SummaryStats) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = stats
        .metrics
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                serde_json::json!({
                    "mean": m.mean,
                    "min": m.min,
                    "max": m.max,
                    "stddev": m.stddev,
                }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, productions: u64, stats: &SummaryStats) {
    let production_display = if productions >= 1000 {
        format!("{}k", productions / 1000)
    } else {
        productions.to_string()
    };
    println!(
        "\n=== {} ({} seeds, {} productions each) ===\n",
        scenario_name, stats.seed_count, production_display
    );
    println!(
        "{:<30} {:>10} {:>10} {:>10} {:>10}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(74));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<30} {}/{}",
        "stall_rate", stats.stalled_count, stats.seed_count
    );
}
