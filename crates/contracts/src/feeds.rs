//! Auxiliary session feeds: driver list, session info, stints,
//! track/session status, lap count, weather and race-control messages.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::session_time::{serde_seconds, serde_seconds_opt};
use crate::{DriverId, SessionTime};

/// Tyre stint update from the timing app page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StintUpdate {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    pub driver: DriverId,
    pub stint: u32,
    pub lap_number: Option<u32>,
    #[serde(with = "serde_seconds_opt")]
    pub lap_time: Option<SessionTime>,
    pub compound: Option<String>,
    pub new: Option<bool>,
    pub tyres_not_changed: Option<bool>,
    /// Laps on this set, including laps from earlier sessions
    pub total_laps: Option<u32>,
    pub start_laps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackStatusEntry {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    /// Single digit status code ("1" clear, "2" yellow, "4" safety car, ...)
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionStatusEntry {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LapCountEntry {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    pub total_laps: Option<u32>,
    pub current_lap: Option<u32>,
}

/// Weather sample; missing readings are reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherEntry {
    #[serde(with = "serde_seconds")]
    pub time: SessionTime,
    pub air_temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub rainfall: bool,
    pub track_temp: f64,
    pub wind_direction: i64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceControlMessage {
    /// Wall-clock time of the message
    pub utc: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub flag: Option<String>,
    pub scope: Option<String>,
    pub sector: Option<u32>,
    pub racing_number: Option<String>,
    pub lap: Option<u32>,
}

/// Driver details, merged from every `DriverList` patch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverInfo {
    pub racing_number: DriverId,
    pub broadcast_name: Option<String>,
    pub full_name: Option<String>,
    /// Three letter abbreviation
    pub tla: Option<String>,
    /// Line on the timing screen
    pub line: Option<u32>,
    pub team_name: Option<String>,
    pub team_colour: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub reference: Option<String>,
    pub headshot_url: Option<String>,
    pub country_code: Option<String>,
}

impl DriverInfo {
    pub fn new(racing_number: DriverId) -> Self {
        Self {
            racing_number,
            ..Self::default()
        }
    }
}

/// Session metadata from the first `SessionInfo` record.
///
/// Start and end dates are local to the circuit; `gmt_offset` converts them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionInfo {
    pub key: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub session_type: Option<String>,
    pub meeting_name: Option<String>,
    pub circuit: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    #[serde(with = "serde_seconds_opt")]
    pub gmt_offset: Option<SessionTime>,
    pub path: Option<String>,
}

/// Everything decoded from the auxiliary pages of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFeeds {
    /// Drivers in order of first appearance
    pub drivers: Vec<DriverInfo>,
    pub session_info: Option<SessionInfo>,
    pub stints: Vec<StintUpdate>,
    pub track_status: Vec<TrackStatusEntry>,
    pub session_status: Vec<SessionStatusEntry>,
    pub lap_count: Vec<LapCountEntry>,
    pub weather: Vec<WeatherEntry>,
    pub race_control: Vec<RaceControlMessage>,
}

impl SessionFeeds {
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
            && self.session_info.is_none()
            && self.stints.is_empty()
            && self.track_status.is_empty()
            && self.session_status.is_empty()
            && self.lap_count.is_empty()
            && self.weather.is_empty()
            && self.race_control.is_empty()
    }
}
