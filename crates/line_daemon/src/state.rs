use line_core::{Activation, Clock, Constants, EventEnvelope, EventLevel, LineState, MetricsSnapshot};
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Oldest snapshots are dropped past this many.
const MAX_METRICS_HISTORY: usize = 1_000;

pub struct SimState {
    pub line: LineState,
    pub constants: Constants,
    pub content_version: String,
    pub rng: ChaCha8Rng,
    pub clock: Clock,
    pub event_level: EventLevel,
    /// Sample metrics every N production activations; 0 disables sampling.
    pub metrics_every: u64,
    pub metrics_history: VecDeque<MetricsSnapshot>,
}

impl SimState {
    pub fn new(
        line: LineState,
        constants: Constants,
        content_version: String,
        rng: ChaCha8Rng,
        event_level: EventLevel,
        metrics_every: u64,
    ) -> Self {
        let clock = Clock::new(&constants);
        Self {
            line,
            constants,
            content_version,
            rng,
            clock,
            event_level,
            metrics_every,
            metrics_history: VecDeque::new(),
        }
    }

    /// Run one activation against the line and sample metrics when due.
    ///
    /// Does not touch the clock; the tick loop advances it before calling.
    pub fn step(&mut self, activation: Activation) -> Vec<EventEnvelope> {
        let events = line_core::step(
            &mut self.line,
            activation,
            &self.constants,
            &mut self.rng,
            self.event_level,
        );
        let productions = self.line.meta.production_activations;
        if activation == Activation::Production
            && self.metrics_every > 0
            && productions % self.metrics_every == 0
        {
            let snapshot =
                line_core::compute_metrics(&self.line, self.constants.low_stock_threshold);
            self.push_metrics(snapshot);
        }
        events
    }

    pub fn push_metrics(&mut self, snapshot: MetricsSnapshot) {
        if self.metrics_history.len() >= MAX_METRICS_HISTORY {
            self.metrics_history.pop_front();
        }
        self.metrics_history.push_back(snapshot);
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub paused: Arc<AtomicBool>,
    /// Wall-clock multiplier applied on top of the line's own timings.
    pub speed: f64,
}
