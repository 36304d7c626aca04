//! Timing contracts - raw updates in, lap and stream tables out.
//!
//! Column names on serialization match the published lap/stream tables
//! (`Time`, `LapTime`, `Sector1SessionTime`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session_time::{serde_seconds, serde_seconds_opt};
use crate::{DriverId, SessionTime};

/// One timestamped partial update from a timing page.
///
/// Keys absent from `payload` mean "unchanged since the last update".
#[derive(Debug, Clone, PartialEq)]
pub struct RawUpdate {
    pub timestamp: SessionTime,
    pub payload: Value,
}

impl RawUpdate {
    pub fn new(timestamp: SessionTime, payload: Value) -> Self {
        Self { timestamp, payload }
    }
}

/// Ordered updates belonging to a single driver.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdateLog {
    pub driver: DriverId,
    pub updates: Vec<RawUpdate>,
}

impl EntityUpdateLog {
    pub fn new(driver: DriverId) -> Self {
        Self {
            driver,
            updates: Vec::new(),
        }
    }

    pub fn push(&mut self, timestamp: SessionTime, payload: Value) {
        self.updates.push(RawUpdate::new(timestamp, payload));
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// One reconstructed lap of one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LapRecord {
    pub driver: DriverId,

    /// Session time at which the lap ended
    #[serde(rename = "Time", with = "serde_seconds_opt")]
    pub end_time: Option<SessionTime>,

    #[serde(with = "serde_seconds_opt")]
    pub lap_time: Option<SessionTime>,

    /// Engine-assigned lap number, independent of the feed's own counter
    pub lap_number: Option<u32>,

    pub pit_stop_count: Option<u32>,

    #[serde(with = "serde_seconds_opt")]
    pub pit_in_time: Option<SessionTime>,
    #[serde(with = "serde_seconds_opt")]
    pub pit_out_time: Option<SessionTime>,

    #[serde(with = "serde_seconds_opt")]
    pub sector_1_time: Option<SessionTime>,
    #[serde(with = "serde_seconds_opt")]
    pub sector_2_time: Option<SessionTime>,
    #[serde(with = "serde_seconds_opt")]
    pub sector_3_time: Option<SessionTime>,

    #[serde(with = "serde_seconds_opt")]
    pub sector_1_session_time: Option<SessionTime>,
    #[serde(with = "serde_seconds_opt")]
    pub sector_2_session_time: Option<SessionTime>,
    #[serde(with = "serde_seconds_opt")]
    pub sector_3_session_time: Option<SessionTime>,

    pub speed_i1: Option<f64>,
    pub speed_i2: Option<f64>,
    #[serde(rename = "SpeedFL")]
    pub speed_fl: Option<f64>,
    #[serde(rename = "SpeedST")]
    pub speed_st: Option<f64>,

    pub is_personal_best: bool,
}

impl LapRecord {
    pub fn new(driver: DriverId) -> Self {
        Self {
            driver,
            ..Default::default()
        }
    }

    /// The three sector times, in track order.
    pub fn sectors(&self) -> [Option<SessionTime>; 3] {
        [self.sector_1_time, self.sector_2_time, self.sector_3_time]
    }

    /// Sum of all three sector times, if every sector is present.
    pub fn sector_sum(&self) -> Option<SessionTime> {
        Some(self.sector_1_time? + self.sector_2_time? + self.sector_3_time?)
    }

    /// Whether any timing or speed-trap field was populated for this lap.
    pub fn has_timing_data(&self) -> bool {
        self.sectors().iter().any(Option::is_some)
            || self.lap_time.is_some()
            || self.speed_i1.is_some()
            || self.speed_i2.is_some()
            || self.speed_fl.is_some()
            || self.speed_st.is_some()
    }
}

/// Forward-filled position/gap sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamSample {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    pub driver: DriverId,
    pub position: Option<u32>,
    pub gap_to_leader: Option<String>,
    #[serde(rename = "IntervalToPositionAhead")]
    pub interval_to_ahead: Option<String>,
}

/// Why a lap failed a timing invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrityReason {
    /// Sector times add up to more than the lap time; the lap time was cleared
    SectorSumExceedsLapTime,
    /// A derived lap end would precede an earlier lap's end
    TimeOrderingViolation,
}

impl IntegrityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrityReason::SectorSumExceedsLapTime => "sector_sum_exceeds_lap_time",
            IntegrityReason::TimeOrderingViolation => "time_ordering_violation",
        }
    }
}

/// A recorded, non-fatal timing inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityError {
    pub driver: DriverId,
    pub lap_number: u32,
    pub reason: IntegrityReason,
}

impl IntegrityError {
    pub fn new(driver: DriverId, lap_number: u32, reason: IntegrityReason) -> Self {
        Self {
            driver,
            lap_number,
            reason,
        }
    }
}
