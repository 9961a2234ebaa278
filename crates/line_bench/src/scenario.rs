//! Scenario files: which line to run, for how long, under which seeds and
//! overrides. `prepare` turns a scenario into validated run inputs before any
//! seed is spent on it.

use crate::overrides;
use anyhow::{bail, ensure, Context, Result};
use line_core::LineState;
use line_world::LineContent;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Production activations per seed; restocks are interleaved by the clock.
    pub productions: u64,
    #[serde(default = "default_metrics_every")]
    pub metrics_every: u64,
    pub seeds: SeedSpec,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Saved `LineState` every seed resumes from instead of a fresh line.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
}

fn default_metrics_every() -> u64 {
    10
}

fn default_content_dir() -> String {
    "./content".to_string()
}

/// Either `[1, 2, 3]` or `{"range": [first, last]}` (inclusive).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    /// Seeds in run order. Each seed owns a `seed_<n>` directory, so repeats
    /// are rejected rather than silently overwriting each other.
    pub fn expand(&self) -> Result<Vec<u64>> {
        let seeds: Vec<u64> = match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range: [first, last] } => (*first..=*last).collect(),
        };
        ensure!(!seeds.is_empty(), "scenario 'seeds' must produce at least one seed");
        let mut seen = BTreeSet::new();
        if let Some(dup) = seeds.iter().find(|seed| !seen.insert(**seed)) {
            bail!("scenario 'seeds' lists seed {dup} more than once");
        }
        Ok(seeds)
    }
}

/// Content with overrides applied, the optional starting state, and the seeds.
#[derive(Debug)]
pub struct PreparedScenario {
    pub content: LineContent,
    pub base_state: Option<LineState>,
    pub seeds: Vec<u64>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file: {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&json)
            .with_context(|| format!("parsing scenario file: {}", path.display()))?;
        ensure!(!scenario.name.is_empty(), "scenario 'name' must not be empty");
        ensure!(scenario.productions > 0, "scenario 'productions' must be > 0");
        ensure!(
            scenario.metrics_every > 0,
            "scenario 'metrics_every' must be > 0"
        );
        Ok(scenario)
    }

    /// Load the content, apply overrides and check the line still builds.
    /// A starting state must describe the same line as the content.
    pub fn prepare(&self) -> Result<PreparedScenario> {
        let seeds = self.seeds.expand()?;

        let mut content = line_world::load_content(&self.content_dir)?;
        overrides::apply_overrides(&mut content, &self.overrides)?;
        line_world::new_line(&content, Some(0)).context("applying scenario overrides")?;

        let base_state = match self.state {
            Some(ref path) => {
                let state = read_state(path)?;
                check_state_matches_content(&state, &content)
                    .with_context(|| format!("state file {path} does not fit the content"))?;
                Some(state)
            }
            None => None,
        };

        Ok(PreparedScenario {
            content,
            base_state,
            seeds,
        })
    }

    /// Parameters recorded alongside every run of this scenario.
    pub fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "productions": self.productions,
            "metrics_every": self.metrics_every,
            "content_dir": self.content_dir,
            "state": self.state,
            "overrides": self.overrides,
        })
    }
}

fn read_state(path: &str) -> Result<LineState> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading state file: {path}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))
}

/// Stations, their workers and their bins must line up key for key. Stock,
/// countdowns and attribute values are free to differ.
fn check_state_matches_content(state: &LineState, content: &LineContent) -> Result<()> {
    let seed = &content.seed;

    let state_stations: BTreeSet<(&str, &str)> = state
        .stations
        .iter()
        .map(|s| {
            let worker = state.worker(s.worker_id).map_or("?", |w| w.key.as_str());
            (s.key.as_str(), worker)
        })
        .collect();
    let content_stations: BTreeSet<(&str, &str)> = seed
        .stations
        .iter()
        .map(|s| (s.key.as_str(), s.worker.as_str()))
        .collect();
    if let Some((station, worker)) = state_stations.symmetric_difference(&content_stations).next()
    {
        bail!("station '{station}' staffed by '{worker}' is not in both state and content");
    }

    let state_bins: BTreeSet<(&str, &str)> = state
        .bins
        .iter()
        .map(|b| {
            let item = state.item(b.item_id).map_or("?", |i| i.key.as_str());
            let station = state.station(b.station_id).map_or("?", |s| s.key.as_str());
            (item, station)
        })
        .collect();
    let content_bins: BTreeSet<(&str, &str)> = seed
        .bins
        .iter()
        .map(|b| (b.item.as_str(), b.station.as_str()))
        .collect();
    if let Some((item, station)) = state_bins.symmetric_difference(&content_bins).next() {
        bail!("bin '{item}@{station}' is not in both state and content");
    }

    Ok(())
}
