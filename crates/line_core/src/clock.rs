//! Virtual clock merging the restock and production periods into one
//! serialized timeline.

use crate::{Activation, Constants};

/// Deterministic scheduler over real (wall-clock equivalent) seconds.
///
/// Activation `n` of a cycle fires at `n × interval`, so long runs do not
/// accumulate float drift. When both cycles are due at the same instant the
/// restock fires first.
#[derive(Debug, Clone)]
pub struct Clock {
    restock_interval_secs: f64,
    production_interval_secs: f64,
    restocks_fired: u64,
    productions_fired: u64,
    now_secs: f64,
}

impl Clock {
    pub fn new(constants: &Constants) -> Self {
        Self {
            restock_interval_secs: constants.restock_interval_secs(),
            production_interval_secs: constants.production_interval_secs(),
            restocks_fired: 0,
            productions_fired: 0,
            now_secs: 0.0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn next_restock_at(&self) -> f64 {
        (self.restocks_fired + 1) as f64 * self.restock_interval_secs
    }

    #[allow(clippy::cast_precision_loss)]
    fn next_production_at(&self) -> f64 {
        (self.productions_fired + 1) as f64 * self.production_interval_secs
    }

    /// Peek at the next activation without consuming it.
    pub fn peek(&self) -> (f64, Activation) {
        let restock_at = self.next_restock_at();
        let production_at = self.next_production_at();
        if restock_at <= production_at {
            (restock_at, Activation::Restock)
        } else {
            (production_at, Activation::Production)
        }
    }

    /// Advance to the next activation and return it.
    pub fn advance(&mut self) -> Activation {
        let (at, activation) = self.peek();
        self.now_secs = at;
        match activation {
            Activation::Restock => self.restocks_fired += 1,
            Activation::Production => self.productions_fired += 1,
        }
        activation
    }

    /// Real seconds elapsed at the last activation.
    pub fn now_secs(&self) -> f64 {
        self.now_secs
    }

    pub fn productions_fired(&self) -> u64 {
        self.productions_fired
    }

    pub fn restocks_fired(&self) -> u64 {
        self.restocks_fired
    }
}

impl Iterator for Clock {
    type Item = Activation;

    fn next(&mut self) -> Option<Activation> {
        Some(self.advance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants(restock_period_secs: f64, restock_time_stretch: f64) -> Constants {
        Constants {
            completion_tick_secs: 1.0,
            restock_period_secs,
            restock_time_stretch,
            ..Constants::default()
        }
    }

    #[test]
    fn interleaves_by_period() {
        let clock = Clock::new(&constants(3.0, 1.0));
        let sequence: Vec<Activation> = clock.take(8).collect();
        use Activation::{Production as P, Restock as R};
        // Production at 1,2,3(tie→restock first),3,4,5,6(tie)...
        assert_eq!(sequence, vec![P, P, R, P, P, P, R, P]);
    }

    #[test]
    fn restock_stretch_shortens_real_interval() {
        let mut clock = Clock::new(&constants(10.0, 5.0));
        // Real restock interval is 2s.
        let first_restock = (&mut clock)
            .position(|a| a == Activation::Restock)
            .unwrap();
        assert_eq!(first_restock, 1);
        assert!((clock.now_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn counts_activations_without_drift() {
        let mut clock = Clock::new(&Constants {
            completion_tick_secs: 0.1,
            ..constants(300.0, 1.0)
        });
        while clock.productions_fired() < 10_000 {
            clock.advance();
        }
        assert_eq!(clock.restocks_fired(), 3);
        assert!((clock.now_secs() - 1000.0).abs() < 1e-6);
    }
}
