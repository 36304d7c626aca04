//! Typed view over one driver's partial timing update.

use contracts::SessionTime;
use ingestion::value::{as_f64, as_i64, as_session_time, as_string, as_u32, get_present};
use serde_json::Value;

/// Speed trap identifiers as sent by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTrap {
    I1,
    I2,
    FinishLine,
    SpeedTrap,
}

impl SpeedTrap {
    pub const ALL: [SpeedTrap; 4] = [
        SpeedTrap::I1,
        SpeedTrap::I2,
        SpeedTrap::FinishLine,
        SpeedTrap::SpeedTrap,
    ];

    fn key(&self) -> &'static str {
        match self {
            SpeedTrap::I1 => "I1",
            SpeedTrap::I2 => "I2",
            SpeedTrap::FinishLine => "FL",
            SpeedTrap::SpeedTrap => "ST",
        }
    }
}

/// Borrowed accessor for the fields the engine reads from a `Lines` entry.
#[derive(Debug, Clone, Copy)]
pub struct TimingLine<'a>(&'a Value);

impl<'a> TimingLine<'a> {
    pub fn new(payload: &'a Value) -> Self {
        Self(payload)
    }

    /// The feed's own lap counter, if this update carries it
    pub fn number_of_laps(&self) -> Option<i64> {
        self.0.get("NumberOfLaps").and_then(as_i64)
    }

    /// Only literal booleans count; the feed sends `InPit` once per change.
    pub fn in_pit(&self) -> Option<bool> {
        self.0.get("InPit").and_then(Value::as_bool)
    }

    /// Sector time for sector `index` (0-based). Lists are ignored: they only
    /// ever appear in snapshots and never carry values.
    pub fn sector_time(&self, index: usize) -> Option<SessionTime> {
        let sectors = self.0.get("Sectors").filter(|s| s.is_object())?;
        get_present(sectors, &[sector_key(index)?, "Value"]).and_then(as_session_time)
    }

    pub fn last_lap_time(&self) -> Option<SessionTime> {
        get_present(self.0, &["LastLapTime", "Value"]).and_then(as_session_time)
    }

    pub fn speed(&self, trap: SpeedTrap) -> Option<f64> {
        get_present(self.0, &["Speeds", trap.key(), "Value"]).and_then(as_f64)
    }

    pub fn best_lap_time(&self) -> Option<SessionTime> {
        get_present(self.0, &["BestLapTime", "Value"]).and_then(as_session_time)
    }

    /// Sub-session index carried as the key of the `BestLapTimes` object
    pub fn best_lap_times_session(&self) -> Option<usize> {
        let map = self.0.get("BestLapTimes")?.as_object()?;
        map.keys().filter_map(|k| k.parse::<usize>().ok()).max()
    }

    pub fn position(&self) -> Option<u32> {
        get_present(self.0, &["Position"]).and_then(as_u32)
    }

    pub fn gap_to_leader(&self) -> Option<String> {
        get_present(self.0, &["GapToLeader"]).and_then(as_string)
    }

    pub fn interval_to_ahead(&self) -> Option<String> {
        get_present(self.0, &["IntervalToPositionAhead", "Value"]).and_then(as_string)
    }
}

fn sector_key(index: usize) -> Option<&'static str> {
    ["0", "1", "2"].get(index).copied()
}
