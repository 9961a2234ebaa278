mod routes;
mod state;
mod tick_loop;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use line_core::EventLevel;
use parking_lot::Mutex;
use state::{AppState, SimState};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "line_daemon", about = "Kanban lamp line simulation daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the line in wall-clock time and serve it over HTTP.
    Run {
        /// Build the line from content with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load an initial LineState from a JSON file. Mutually exclusive with --seed.
        /// The RNG restarts from the saved seed, replaying its draws from the start.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 3001)]
        port: u16,
        /// Wall-clock multiplier; 0 runs activations back to back.
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Stop the tick loop after this many production activations.
        #[arg(long)]
        max_productions: Option<u64>,
        /// Start paused; resume with POST /api/v1/resume.
        #[arg(long)]
        paused: bool,
        /// Sample metrics every N production activations (0 disables).
        #[arg(long, default_value_t = 10)]
        metrics_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        #[arg(long, default_value = "http://localhost:5173")]
        cors_origin: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seed,
            state_file,
            content_dir,
            port,
            speed,
            max_productions,
            paused,
            metrics_every,
            event_level,
            cors_origin,
        } => {
            if !speed.is_finite() || speed < 0.0 {
                anyhow::bail!("--speed must be a non-negative number, got {speed}");
            }
            let content = line_world::load_content(&content_dir)?;
            let (line, rng) = match state_file {
                Some(path) => line_world::load_state(&path)?,
                None => line_world::new_line(&content, seed)?,
            };
            let level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };

            tracing::info!(
                seed = line.meta.seed,
                stations = line.stations.len(),
                bins = line.bins.len(),
                content_version = %content.content_version,
                speed,
                "line ready"
            );

            let sim = SimState::new(
                line,
                content.constants,
                content.content_version,
                rng,
                level,
                metrics_every,
            );
            let (event_tx, _) = tokio::sync::broadcast::channel(256);
            let app_state = AppState {
                sim: Arc::new(Mutex::new(sim)),
                event_tx,
                paused: Arc::new(AtomicBool::new(paused)),
                speed,
            };

            let router = routes::make_router_with_cors(app_state.clone(), &cors_origin)?;
            tokio::spawn(tick_loop::run_tick_loop(app_state, max_productions));

            let addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!("listening on http://{addr}");
            axum::serve(listener, router).await.context("serving HTTP")?;
        }
    }
    Ok(())
}
