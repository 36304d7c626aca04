//! Engine output: reconciled tables plus the diagnostics gathered on the way.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session_time::serde_seconds;
use crate::{
    CarFrame, ChannelSource, ChannelTable, DriverId, IntegrityError, IntegrityReason, LapRecord,
    PositionFrame, SessionFeeds, SessionTime, StreamSample,
};

/// Record-level decode counts for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    pub page: String,
    pub total_records: usize,
    pub decoded: usize,
    pub errors: usize,
}

impl DecodeStats {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..Default::default()
        }
    }

    pub fn record_ok(&mut self) {
        self.total_records += 1;
        self.decoded += 1;
    }

    pub fn record_error(&mut self) {
        self.total_records += 1;
        self.errors += 1;
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_records > 0 {
            self.errors as f64 / self.total_records as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Scalar shift applied to one driver's lap end times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockShift {
    pub driver: DriverId,
    #[serde(with = "serde_seconds")]
    pub shift: SessionTime,
}

/// Result of the cross-driver clock alignment step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOutcome {
    pub applied: bool,
    /// Lap index the alignment was anchored on
    pub lap_index: Option<usize>,
    pub leader: Option<DriverId>,
    pub shifts: Vec<ClockShift>,
    /// Why alignment was skipped, if it was
    pub skipped_reason: Option<String>,
}

impl AlignmentOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// A channel table that had to be padded up to the reference length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteChannel {
    pub driver: DriverId,
    pub source: ChannelSource,
    pub padded_rows: usize,
}

/// Diagnostics returned alongside the tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    pub drivers: usize,
    pub integrity_errors: Vec<IntegrityError>,
    pub decode: Vec<DecodeStats>,
    /// Updates dropped because their lap counter regressed
    pub stale_updates: u64,
    pub alignment: AlignmentOutcome,
    pub incomplete_channels: Vec<IncompleteChannel>,
    /// Drivers whose raw brake channel held values other than off/on
    pub non_boolean_brake: Vec<DriverId>,
}

impl EngineReport {
    pub fn integrity_count(&self, reason: IntegrityReason) -> usize {
        self.integrity_errors
            .iter()
            .filter(|e| e.reason == reason)
            .count()
    }

    pub fn decode_errors(&self) -> usize {
        self.decode.iter().map(|d| d.errors).sum()
    }
}

/// Everything the engine produces for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTiming {
    pub laps: Vec<LapRecord>,
    pub stream: Vec<StreamSample>,
    pub car: BTreeMap<DriverId, ChannelTable<CarFrame>>,
    pub position: BTreeMap<DriverId, ChannelTable<PositionFrame>>,
    /// Start of each sub-session (e.g. Q1/Q2/Q3), earliest across drivers
    #[serde(with = "serde_seconds_vec")]
    pub session_splits: Vec<SessionTime>,
    pub feeds: SessionFeeds,
    pub report: EngineReport,
}

impl SessionTiming {
    pub fn laps_for<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a LapRecord> + 'a {
        self.laps.iter().filter(move |lap| lap.driver == driver)
    }
}

mod serde_seconds_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::session_time::{as_secs_f64, from_secs_f64};
    use crate::SessionTime;

    pub fn serialize<S>(times: &[SessionTime], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs: Vec<f64> = times.iter().map(|t| as_secs_f64(*t)).collect();
        secs.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<SessionTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Vec::<f64>::deserialize(deserializer)?;
        Ok(secs.into_iter().map(from_secs_f64).collect())
    }
}
