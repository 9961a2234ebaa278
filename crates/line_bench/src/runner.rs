use crate::run_result::{self, RunResult, SummaryMetrics};
use anyhow::{Context, Result};
use line_core::{Activation, Clock, EventLevel, LineState, MetricsFileWriter, MetricsSnapshot};
use line_world::{LineContent, RunInfo};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Everything shared by the seeds of one scenario.
pub struct RunPlan<'a> {
    pub content: &'a LineContent,
    pub productions: u64,
    pub metrics_every: u64,
    pub scenario_name: &'a str,
    pub scenario_params: &'a serde_json::Value,
    pub base_state: Option<&'a LineState>,
}

pub struct SeedResult {
    pub seed: u64,
    pub final_snapshot: MetricsSnapshot,
    pub run_id: String,
}

fn initial_line(plan: &RunPlan<'_>, seed: u64) -> Result<(LineState, ChaCha8Rng)> {
    if let Some(base) = plan.base_state {
        let mut state = base.clone();
        state.meta.seed = seed;
        return Ok((state, ChaCha8Rng::seed_from_u64(seed)));
    }
    line_world::new_line(plan.content, Some(seed))
}

pub fn run_seed(plan: &RunPlan<'_>, seed: u64, seed_dir: &Path) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let constants = &plan.content.constants;

    let (mut state, mut rng) = initial_line(plan, seed)?;
    let activations_start = state.meta.tick;

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    line_world::write_run_info(
        seed_dir,
        &RunInfo {
            run_id: run_id.clone(),
            seed,
            content_version: plan.content.content_version.clone(),
            runner: "line_bench".to_string(),
            metrics_every: plan.metrics_every,
            constants: constants.clone(),
            args: serde_json::json!({
                "scenario": plan.scenario_name,
                "productions": plan.productions,
            }),
        },
    )?;

    let mut metrics_writer = MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;

    let mut clock = Clock::new(constants);
    while clock.productions_fired() < plan.productions {
        let activation = clock.advance();
        line_core::step(&mut state, activation, constants, &mut rng, EventLevel::Normal);

        if activation == Activation::Production
            && clock.productions_fired() % plan.metrics_every == 0
        {
            let snapshot = line_core::compute_metrics(&state, constants.low_stock_threshold);
            metrics_writer
                .write_row(&snapshot)
                .context("writing metrics row")?;
        }
    }

    // Always capture the final snapshot.
    let final_snapshot = line_core::compute_metrics(&state, constants.low_stock_threshold);
    if plan.productions % plan.metrics_every != 0 {
        metrics_writer
            .write_row(&final_snapshot)
            .context("writing final metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let activations_total = state.meta.tick - activations_start;
    let activations_per_second = if wall_time_ms > 0 {
        activations_total as f64 / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    let (stall_occurred, stall_reason) = run_result::detect_stall(&final_snapshot);

    let run_result = RunResult {
        run_schema_version: 1,
        run_status: "completed".to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: plan.scenario_name.to_string(),
        scenario_params: plan.scenario_params.clone(),
        productions: plan.productions,
        activations_total,
        sim_time_secs: state.meta.sim_time_secs,
        wall_time_ms,
        activations_per_second,
        summary_metrics: Some(SummaryMetrics::from_snapshot(&final_snapshot)),
        stall_occurred,
        stall_reason,
        metrics_path: "metrics_000.csv".to_string(),
        error_message: None,
    };

    run_result
        .write_atomic(&seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    Ok(SeedResult {
        seed,
        final_snapshot,
        run_id,
    })
}
