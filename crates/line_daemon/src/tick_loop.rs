use crate::state::AppState;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

const PAUSE_POLL: Duration = Duration::from_millis(50);

/// Drive the line from its virtual clock in wall-clock time.
///
/// A single task fires every activation, so restock and production never
/// overlap. `speed` scales the clock (2.0 runs twice as fast); 0 disables
/// sleeping entirely. Stops after `max_productions` when given.
pub async fn run_tick_loop(app: AppState, max_productions: Option<u64>) {
    let mut origin = Instant::now();
    let mut was_paused = false;

    loop {
        if app.paused.load(Ordering::Relaxed) {
            was_paused = true;
            tokio::time::sleep(PAUSE_POLL).await;
            continue;
        }

        let (next_at, now_secs) = {
            let sim = app.sim.lock();
            (sim.clock.peek().0, sim.clock.now_secs())
        };

        if app.speed > 0.0 {
            if was_paused {
                // Rebase so the schedule resumes from the current instant
                // instead of bursting through the paused span.
                let elapsed = Duration::from_secs_f64(now_secs / app.speed);
                origin = Instant::now().checked_sub(elapsed).unwrap_or_else(Instant::now);
            }
            let due = origin + Duration::from_secs_f64(next_at / app.speed);
            tokio::time::sleep_until(due).await;
        } else {
            tokio::task::yield_now().await;
        }
        was_paused = false;

        if app.paused.load(Ordering::Relaxed) {
            continue;
        }

        let (events, done) = {
            let mut sim = app.sim.lock();
            let activation = sim.clock.advance();
            let trays_before = sim.line.trays.len();
            let events = sim.step(activation);
            if sim.line.trays.len() > trays_before {
                tracing::debug!(
                    trays = sim.line.trays.len(),
                    lamps = sim.line.lamps.len(),
                    "tray opened"
                );
            }
            let done = max_productions
                .is_some_and(|max| sim.line.meta.production_activations >= max);
            (events, done)
        };

        let _ = app.event_tx.send(events);

        if done {
            tracing::info!("reached max productions, tick loop stopping");
            break;
        }
    }
}
