//! Content loading and run bookkeeping shared between line_cli, line_daemon
//! and line_bench.

use anyhow::{Context, Result};
use line_core::{
    build_line, validate_constants, BinSeed, Constants, ItemSeed, LineSeed, LineState,
    StationSeed, WorkerSeed,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything read from a content directory.
#[derive(Debug, Clone)]
pub struct LineContent {
    pub content_version: String,
    pub constants: Constants,
    pub seed: LineSeed,
}

#[derive(Deserialize)]
struct ItemsFile {
    content_version: String,
    items: Vec<ItemSeed>,
}

#[derive(Deserialize)]
struct WorkersFile {
    workers: Vec<WorkerSeed>,
}

#[derive(Deserialize)]
struct StationsFile {
    stations: Vec<StationSeed>,
}

#[derive(Deserialize)]
struct BinsFile {
    bins: Vec<BinSeed>,
}

fn read_json<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Result<T> {
    let path = dir.join(file_name);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file_name}"))
}

/// Load `constants.json`, `items.json`, `workers.json`, `stations.json` and
/// `bins.json` from `content_dir`.
///
/// Constants are validated here; cross-references between the seed files are
/// checked when the line is built.
pub fn load_content(content_dir: &str) -> Result<LineContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    validate_constants(&constants).context("validating constants.json")?;
    let items_file: ItemsFile = read_json(dir, "items.json")?;
    let workers_file: WorkersFile = read_json(dir, "workers.json")?;
    let stations_file: StationsFile = read_json(dir, "stations.json")?;
    let bins_file: BinsFile = read_json(dir, "bins.json")?;
    Ok(LineContent {
        content_version: items_file.content_version,
        constants,
        seed: LineSeed {
            items: items_file.items,
            workers: workers_file.workers,
            stations: stations_file.stations,
            bins: bins_file.bins,
        },
    })
}

pub fn build_initial_state(
    content: &LineContent,
    seed: u64,
    rng: &mut impl Rng,
) -> Result<LineState> {
    build_line(
        &content.seed,
        &content.constants,
        seed,
        &content.content_version,
        rng,
    )
    .context("building line from content")
}

/// Build a fresh line, drawing a random seed when none is given. Returns the
/// state together with the RNG that drove setup, ready for the first activation.
pub fn new_line(content: &LineContent, seed: Option<u64>) -> Result<(LineState, ChaCha8Rng)> {
    let resolved_seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(resolved_seed);
    let state = build_initial_state(content, resolved_seed, &mut rng)?;
    Ok((state, rng))
}

/// Load a saved `LineState` and reseed the RNG from its recorded seed.
///
/// The RNG position is not part of the saved state, so a resumed run draws the
/// same sequence the original run started with rather than continuing it.
pub fn load_state(path: &str) -> Result<(LineState, ChaCha8Rng)> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading state file: {path}"))?;
    let state: LineState =
        serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))?;
    let rng = ChaCha8Rng::seed_from_u64(state.meta.seed);
    Ok((state, rng))
}

// ---------------------------------------------------------------------------
// Run directories
// ---------------------------------------------------------------------------

/// `YYYYMMDD_HHMMSS_seed{seed}` in UTC.
pub fn generate_run_id(seed: u64) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{timestamp}_seed{seed}")
}

pub fn create_run_dir(base: &Path, run_id: &str) -> Result<PathBuf> {
    let dir = base.join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

/// Contents of `run_info.json`, written once at the start of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub seed: u64,
    pub content_version: String,
    pub runner: String,
    pub metrics_every: u64,
    pub constants: Constants,
    #[serde(default)]
    pub args: serde_json::Value,
}

pub fn write_run_info(dir: &Path, info: &RunInfo) -> Result<()> {
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
