use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use line_core::MetricsSnapshot;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod overrides;
mod run_result;
mod runner;
mod scenario;
mod summary;

#[derive(Parser)]
#[command(
    name = "line_bench",
    about = "Multi-seed scenario runner for the lamp line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file across multiple seeds.
    Run {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

fn write_json_atomic(path: &Path, value: &serde_json::Value) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value).context("serializing batch summary")?;
    let mut file =
        std::fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    file.write_all(json.as_bytes())
        .context("writing batch summary")?;
    file.sync_all()?;
    std::fs::rename(&tmp, path).context("renaming batch summary")?;
    Ok(())
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::Scenario::load(Path::new(scenario_path))?;
    let scenario::PreparedScenario {
        content,
        base_state,
        seeds,
    } = scenario.prepare()?;

    println!(
        "Loading scenario '{}': {} seeds × {} productions",
        scenario.name,
        seeds.len(),
        scenario.productions
    );
    if let Some(ref state_path) = scenario.state {
        println!("Using state file: {state_path}");
    }
    let scenario_params = scenario.params();

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;

    println!("Output: {}", run_dir.display());
    println!("Running {} seeds in parallel...", seeds.len());

    let plan = runner::RunPlan {
        content: &content,
        productions: scenario.productions,
        metrics_every: scenario.metrics_every,
        scenario_name: &scenario.name,
        scenario_params: &scenario_params,
        base_state: base_state.as_ref(),
    };
    let results: Vec<Result<runner::SeedResult>> = seeds
        .par_iter()
        .map(|&seed| runner::run_seed(&plan, seed, &run_dir.join(format!("seed_{seed}"))))
        .collect();

    let mut seed_results = Vec::new();
    for result in results {
        match result {
            Ok(seed_result) => seed_results.push(seed_result),
            Err(err) => eprintln!("Seed failed: {err:#}"),
        }
    }
    if seed_results.is_empty() {
        anyhow::bail!("all seeds failed");
    }

    let snapshot_refs: Vec<(u64, &MetricsSnapshot)> = seed_results
        .iter()
        .map(|r| (r.seed, &r.final_snapshot))
        .collect();
    let stats = summary::compute_summary(&snapshot_refs);
    summary::print_summary(&scenario.name, scenario.productions, &stats);

    let summary_path = run_dir.join("summary.json");
    let summary_json = serde_json::to_string_pretty(&stats).context("serializing summary")?;
    std::fs::write(&summary_path, summary_json)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let run_ids: Vec<&str> = seed_results.iter().map(|r| r.run_id.as_str()).collect();
    let batch_summary = serde_json::json!({
        "batch_schema_version": 1,
        "batch_id": Uuid::new_v4().to_string(),
        "scenario_name": scenario.name,
        "scenario_params": scenario_params,
        "seed_count": seed_results.len(),
        "run_ids": run_ids,
        "stalled_count": stats.stalled_count,
        "aggregated_metrics": summary::build_aggregated_metrics(&stats),
    });
    let batch_path = run_dir.join("batch_summary.json");
    write_json_atomic(&batch_path, &batch_summary)?;

    println!("Summary written to {}", summary_path.display());
    println!("Batch summary written to {}", batch_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir)?,
    }
    Ok(())
}
