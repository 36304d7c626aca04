//! Engine configuration contracts that can be shared across crates.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Timing engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Lap reconstruction windows
    #[serde(default)]
    #[validate(nested)]
    pub timing: TimingConfig,

    /// Cross-driver clock alignment
    #[serde(default)]
    #[validate(nested)]
    pub alignment: AlignmentConfig,

    /// Car and position telemetry decoding
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// Per-driver worker settings
    #[serde(default)]
    #[validate(nested)]
    pub runtime: RuntimeConfig,
}

/// Lap reconstruction windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TimingConfig {
    /// Values arriving this soon after a lap boundary belong to the lap just ended
    #[validate(range(min = 1, max = 60000))]
    pub late_value_window_ms: u64,

    /// A pit exit this close to the next boundary is attributed to the next lap
    #[validate(range(min = 1, max = 60000))]
    pub pit_lookahead_ms: u64,

    /// Reported lap times at or above this are discarded
    #[validate(range(min = 1000))]
    pub max_lap_time_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            late_value_window_ms: 5000,
            pit_lookahead_ms: 5000,
            max_lap_time_ms: 150_000,
        }
    }
}

impl TimingConfig {
    pub fn late_value_window(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.late_value_window_ms as i64)
    }

    pub fn pit_lookahead(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.pit_lookahead_ms as i64)
    }

    pub fn max_lap_time(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.max_lap_time_ms as i64)
    }
}

/// Cross-driver clock alignment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlignmentConfig {
    pub enabled: bool,

    /// Marker contained in the leader's gap string
    #[validate(length(min = 1))]
    pub leader_sentinel: String,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            leader_sentinel: "LAP".to_string(),
        }
    }
}

/// Channel telemetry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Decode car and position pages at all
    pub enabled: bool,

    /// Treat a missing or undecodable telemetry page as fatal
    pub required: bool,

    /// Raw brake value meaning "pressed"
    #[validate(range(min = 1))]
    pub brake_on_value: i64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            required: true,
            brake_on_value: 100,
        }
    }
}

/// Per-driver worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Process drivers on a rayon pool
    pub parallel: bool,

    /// Pool size (0 = rayon default)
    #[validate(range(max = 256))]
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_threads: 0,
        }
    }
}
