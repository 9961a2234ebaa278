use thiserror::Error;

/// Rejected line configuration. Only raised while building the initial state;
/// the running line never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tray capacity must be positive")]
    NonPositiveTrayCapacity,
    #[error("tray capacity {capacity} does not fit the {max}-lamp position field of a serial")]
    TrayCapacityTooLarge { capacity: u32, max: u32 },
    #[error("{what} '{key}' has negative stock level {level}")]
    NegativeStock {
        what: &'static str,
        key: String,
        level: i64,
    },
    #[error("{what} '{key}' stock level {level} is out of range")]
    StockOutOfRange {
        what: &'static str,
        key: String,
        level: i64,
    },
    #[error("worker '{key}' efficiency must be positive, got {efficiency}")]
    NonPositiveEfficiency { key: String, efficiency: f64 },
    #[error("worker '{key}' defect rate {defect_rate} is outside [0, 100]")]
    DefectRateOutOfRange { key: String, defect_rate: f64 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("completion jitter {0} is outside [0, 1)")]
    JitterOutOfRange(f64),
    #[error("serial prefix '{0}' must be exactly two uppercase ASCII letters")]
    InvalidSerialPrefix(String),
    #[error("station '{station}' references unknown worker '{worker}'")]
    UnknownWorker { station: String, worker: String },
    #[error("bin references unknown item '{0}'")]
    UnknownItem(String),
    #[error("bin references unknown station '{0}'")]
    UnknownStation(String),
    #[error("duplicate bin for item '{item}' at station '{station}'")]
    DuplicateBin { item: String, station: String },
    #[error("duplicate {what} key '{key}'")]
    DuplicateKey { what: &'static str, key: String },
    #[error("station '{station}' initial countdown {countdown} is not finite")]
    NonFiniteCountdown { station: String, countdown: f64 },
    #[error("station '{0}' has no bins")]
    StationWithoutBins(String),
}
