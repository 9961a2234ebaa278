use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use line_core::{
    Activation, Clock, Constants, Event, EventLevel, LineState, MetricsFileWriter, StationStatus,
};
use line_world::{create_run_dir, generate_run_id, load_content, RunInfo};
use rand::Rng;
use std::path::Path;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "line_cli", about = "Kanban lamp line simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the line for a fixed number of production activations.
    Run {
        /// Restock activations are interleaved by the virtual clock.
        #[arg(long)]
        productions: u64,
        /// Build the line from content with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load initial LineState from a JSON file. Mutually exclusive with --seed.
        /// The RNG restarts from the saved seed, replaying its draws from the start.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 100)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        /// Sample metrics every N production activations.
        #[arg(long, default_value_t = 10)]
        metrics_every: u64,
        /// Disable automatic metrics collection to runs/ directory.
        #[arg(long)]
        no_metrics: bool,
    },
}

struct RunArgs {
    productions: u64,
    print_every: u64,
    event_level: EventLevel,
    metrics_every: u64,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Drive `state` until `args.productions` production activations have fired.
fn drive(
    state: &mut LineState,
    constants: &Constants,
    rng: &mut impl Rng,
    args: &RunArgs,
    mut metrics_writer: Option<&mut MetricsFileWriter>,
) -> Result<()> {
    let print_every = args.print_every.max(1);
    let mut clock = Clock::new(constants);

    while clock.productions_fired() < args.productions {
        let activation = clock.advance();
        let events = line_core::step(state, activation, constants, rng, args.event_level);

        // Print notable events regardless of print_every.
        for event in &events {
            if let Event::TrayFilled { ordinal, .. } = &event.event {
                println!(
                    "*** TRAY {ordinal} FILLED at t={:.0}s ***",
                    state.meta.sim_time_secs
                );
            }
        }

        if activation != Activation::Production {
            continue;
        }
        let productions = state.meta.production_activations;
        if productions % print_every == 0 {
            print_status(state, constants);
        }
        if let Some(writer) = metrics_writer.as_deref_mut() {
            if args.metrics_every > 0 && productions % args.metrics_every == 0 {
                let snapshot = line_core::compute_metrics(state, constants.low_stock_threshold);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }
    Ok(())
}

fn run(
    args: &RunArgs,
    seed: Option<u64>,
    state_file: Option<String>,
    content_dir: &str,
    no_metrics: bool,
) -> Result<()> {
    let content = load_content(content_dir)?;

    let (mut state, mut rng) = match state_file {
        Some(path) => line_world::load_state(&path)?,
        None => line_world::new_line(&content, seed)?,
    };

    // Set up per-run metrics directory.
    let mut metrics_writer: Option<MetricsFileWriter> = None;
    if !no_metrics {
        let run_id = generate_run_id(state.meta.seed);
        let run_dir = create_run_dir(Path::new("runs"), &run_id)?;
        let info = RunInfo {
            run_id,
            seed: state.meta.seed,
            content_version: content.content_version.clone(),
            runner: "line_cli".to_string(),
            metrics_every: args.metrics_every,
            constants: content.constants.clone(),
            args: serde_json::json!({
                "productions": args.productions,
                "print_every": args.print_every,
            }),
        };
        line_world::write_run_info(&run_dir, &info)?;
        let writer = MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics_writer = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }

    println!(
        "Starting line: productions={} seed={} stations={} bins={} content_version={}",
        args.productions,
        state.meta.seed,
        state.stations.len(),
        state.bins.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    drive(
        &mut state,
        &content.constants,
        &mut rng,
        args,
        metrics_writer.as_mut(),
    )?;

    println!("{}", "-".repeat(80));
    println!(
        "Done. Final state after {} activations:",
        state.meta.tick
    );
    print_status(&state, &content.constants);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }

    Ok(())
}

fn print_status(state: &LineState, constants: &Constants) {
    let secs = state.meta.sim_time_secs;
    let hour = (secs / 3600.0).floor();
    let minute = ((secs % 3600.0) / 60.0).floor();

    let defected = state.lamps.iter().filter(|l| l.defected).count();
    let low = state
        .bins
        .iter()
        .filter(|b| b.stock_level < constants.low_stock_threshold)
        .count();
    let replacing = state.bins.iter().filter(|b| b.currently_replacing).count();
    let blocked = state
        .stations
        .iter()
        .filter(|s| {
            s.status() == StationStatus::DueForCompletion && !state.station_has_stock(s.id)
        })
        .count();
    let fill = state.active_tray().map_or(0, |t| t.lamp_count);

    println!(
        "[prod={prod:05}  restock={restock:04}  t={hour:02}:{minute:02}]  \
         lamps={lamps:5}  defected={defected:4}  trays={trays:3}  tray_fill={fill:2}  \
         bins_low={low:2}  replacing={replacing:2}  blocked={blocked}",
        prod = state.meta.production_activations,
        restock = state.meta.restock_activations,
        lamps = state.lamps.len(),
        trays = state.trays.len(),
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            productions,
            seed,
            state_file,
            content_dir,
            print_every,
            event_level,
            metrics_every,
            no_metrics,
        } => {
            let level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            let args = RunArgs {
                productions,
                print_every,
                event_level: level,
                metrics_every,
            };
            run(&args, seed, state_file, &content_dir, no_metrics)?;
        }
    }
    Ok(())
}
