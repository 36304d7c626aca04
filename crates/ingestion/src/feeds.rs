//! Auxiliary feed decoders.
//!
//! These pages need no reconciliation: each update maps onto one or more
//! entries of [`SessionFeeds`]. Entries that do not have the expected shape
//! are skipped.

use std::collections::HashMap;

use contracts::{
    DriverId, DriverInfo, LapCountEntry, RaceControlMessage, RawUpdate, SessionInfo,
    SessionStatusEntry, StintUpdate, TrackStatusEntry, WeatherEntry,
};
use serde_json::{Map, Value};
use tracing::trace;

use crate::clock::{parse_session_time, parse_utc};
use crate::value::{as_f64, as_flag, as_i64, as_session_time, as_string, as_u32};

/// Driver details from the driver list page.
///
/// Every update patches some fields of some drivers; later values win.
/// Drivers keep the order in which they first appear.
pub fn driver_list(updates: &[RawUpdate]) -> Vec<DriverInfo> {
    let mut drivers: Vec<DriverInfo> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for update in updates {
        let Some(patches) = update.payload.as_object() else {
            continue;
        };
        for (number, patch) in patches {
            let Some(patch) = patch.as_object() else {
                continue;
            };
            let slot = *index.entry(number.clone()).or_insert_with(|| {
                drivers.push(DriverInfo::new(DriverId::from(number.as_str())));
                drivers.len() - 1
            });
            apply_driver_patch(&mut drivers[slot], patch);
        }
    }

    drivers
}

fn apply_driver_patch(info: &mut DriverInfo, patch: &Map<String, Value>) {
    for (key, value) in patch {
        let text = || as_string(value);
        match key.as_str() {
            "RacingNumber" => {}
            "BroadcastName" => info.broadcast_name = text(),
            "FullName" => info.full_name = text(),
            "Tla" => info.tla = text(),
            "Line" => info.line = as_u32(value),
            "TeamName" => info.team_name = text(),
            "TeamColour" => info.team_colour = text(),
            "FirstName" => info.first_name = text(),
            "LastName" => info.last_name = text(),
            "Reference" => info.reference = text(),
            "HeadshotUrl" => info.headshot_url = text(),
            "CountryCode" => info.country_code = text(),
            _ => trace!(field = %key, "ignoring driver list field"),
        }
    }
}

/// Session metadata, taken from the first object record of the page.
pub fn session_info(updates: &[RawUpdate]) -> Option<SessionInfo> {
    let data = updates.iter().find(|u| u.payload.is_object())?.payload.as_object()?;
    let text = |key: &str| data.get(key).and_then(as_string);
    let meeting = data.get("Meeting");
    let date = |key: &str| data.get(key).and_then(Value::as_str).and_then(parse_utc);

    Some(SessionInfo {
        key: data.get("Key").and_then(as_i64),
        name: text("Name"),
        session_type: text("Type"),
        meeting_name: meeting.and_then(|m| m.get("Name")).and_then(as_string),
        circuit: meeting
            .and_then(|m| m.get("Circuit"))
            .and_then(|c| c.get("ShortName"))
            .and_then(as_string),
        start_date: date("StartDate"),
        end_date: date("EndDate"),
        gmt_offset: data
            .get("GmtOffset")
            .and_then(Value::as_str)
            .and_then(parse_session_time),
        path: text("Path"),
    })
}

/// Tyre stints from the timing app page.
///
/// `Stints` arrives either as a list (index = stint number) or as an object
/// keyed by stint number.
pub fn stints(updates: &[RawUpdate]) -> Vec<StintUpdate> {
    let mut out = Vec::new();

    for update in updates {
        let Some(Value::Object(lines)) = update.payload.get("Lines") else {
            continue;
        };

        for (driver, line) in lines {
            let stints: Vec<(u32, &Value)> = match line.get("Stints") {
                Some(Value::Array(list)) => (0u32..).zip(list.iter()).collect(),
                Some(Value::Object(map)) => {
                    let mut numbered: Vec<(u32, &Value)> = map
                        .iter()
                        .filter_map(|(k, v)| k.parse::<u32>().ok().map(|n| (n, v)))
                        .collect();
                    // keys are strings, so "10" would sort before "2"
                    numbered.sort_by_key(|(n, _)| *n);
                    numbered
                }
                _ => continue,
            };

            for (stint, data) in stints {
                if !data.is_object() {
                    continue;
                }
                out.push(StintUpdate {
                    time: update.timestamp,
                    driver: DriverId::from(driver.as_str()),
                    stint,
                    lap_number: data.get("LapNumber").and_then(as_u32),
                    lap_time: data.get("LapTime").and_then(as_session_time),
                    compound: data.get("Compound").and_then(as_string),
                    new: data.get("New").and_then(as_flag),
                    tyres_not_changed: data.get("TyresNotChanged").and_then(as_flag),
                    total_laps: data.get("TotalLaps").and_then(as_u32),
                    start_laps: data.get("StartLaps").and_then(as_u32),
                });
            }
        }
    }

    out
}

pub fn track_status(updates: &[RawUpdate]) -> Vec<TrackStatusEntry> {
    updates
        .iter()
        .filter(|u| u.payload.is_object())
        .map(|u| TrackStatusEntry {
            time: u.timestamp,
            status: u.payload.get("Status").and_then(as_string).unwrap_or_default(),
            message: u.payload.get("Message").and_then(as_string).unwrap_or_default(),
        })
        .collect()
}

pub fn session_status(updates: &[RawUpdate]) -> Vec<SessionStatusEntry> {
    updates
        .iter()
        .filter_map(|u| {
            let status = u.payload.get("Status").and_then(as_string)?;
            Some(SessionStatusEntry {
                time: u.timestamp,
                status,
            })
        })
        .collect()
}

pub fn lap_count(updates: &[RawUpdate]) -> Vec<LapCountEntry> {
    updates
        .iter()
        .map(|u| LapCountEntry {
            time: u.timestamp,
            total_laps: u.payload.get("TotalLaps").and_then(as_u32),
            current_lap: u.payload.get("CurrentLap").and_then(as_u32),
        })
        .collect()
}

/// Weather samples; unreadable values fall back to zero.
pub fn weather(updates: &[RawUpdate]) -> Vec<WeatherEntry> {
    updates
        .iter()
        .filter(|u| u.payload.is_object())
        .map(|u| {
            let reading = |key: &str| u.payload.get(key).and_then(as_f64).unwrap_or(0.0);
            WeatherEntry {
                time: u.timestamp,
                air_temp: reading("AirTemp"),
                humidity: reading("Humidity"),
                pressure: reading("Pressure"),
                rainfall: u
                    .payload
                    .get("Rainfall")
                    .and_then(as_string)
                    .is_some_and(|v| v == "1"),
                track_temp: reading("TrackTemp"),
                wind_direction: u.payload.get("WindDirection").and_then(as_i64).unwrap_or(0),
                wind_speed: reading("WindSpeed"),
            }
        })
        .collect()
}

/// Race-control messages. `Messages` is either a list or an object keyed by
/// message index.
pub fn race_control(updates: &[RawUpdate]) -> Vec<RaceControlMessage> {
    let mut out = Vec::new();

    for update in updates {
        let messages: Vec<&Value> = match update.payload.get("Messages") {
            Some(Value::Array(list)) => list.iter().collect(),
            Some(Value::Object(map)) => map.values().collect(),
            _ => {
                trace!(timestamp = ?update.timestamp, "race control update without Messages");
                continue;
            }
        };

        for message in messages {
            let text = |key: &str| message.get(key).and_then(as_string);
            out.push(RaceControlMessage {
                utc: message.get("Utc").and_then(Value::as_str).and_then(parse_utc),
                category: text("Category"),
                message: text("Message"),
                status: text("Status"),
                flag: text("Flag"),
                scope: text("Scope"),
                sector: message.get("Sector").and_then(as_u32),
                racing_number: text("RacingNumber"),
                lap: message.get("Lap").and_then(as_u32),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    fn update(secs: i64, payload: Value) -> RawUpdate {
        RawUpdate::new(TimeDelta::seconds(secs), payload)
    }

    #[test]
    fn test_stints_list_and_object_forms() {
        let updates = vec![
            update(10, json!({"Lines": {"1": {"Stints": [{"Compound": "SOFT", "New": "true", "TotalLaps": 0}]}}})),
            update(20, json!({"Lines": {"1": {"Stints": {"1": {"Compound": "HARD", "New": "false", "LapTime": "1:33.120", "LapNumber": 18}}}}})),
            update(30, json!({"Lines": {"44": {"GridPos": "3"}}})),
        ];
        let stints = stints(&updates);
        assert_eq!(stints.len(), 2);
        assert_eq!(stints[0].stint, 0);
        assert_eq!(stints[0].compound.as_deref(), Some("SOFT"));
        assert_eq!(stints[0].new, Some(true));
        assert_eq!(stints[1].stint, 1);
        assert_eq!(stints[1].new, Some(false));
        assert_eq!(stints[1].lap_number, Some(18));
        assert_eq!(stints[1].lap_time, Some(TimeDelta::milliseconds(93_120)));
    }

    #[test]
    fn test_driver_list_merges_patches() {
        let updates = vec![
            update(0, json!({
                "1": {"RacingNumber": "1", "Tla": "VER", "TeamName": "Red Bull Racing", "Line": 1},
                "44": {"RacingNumber": "44", "Tla": "HAM", "TeamColour": "6CD3BF", "Line": 2},
                "_kf": true
            })),
            update(90, json!({"44": {"Line": 1}, "1": {"Line": 2}})),
            update(95, json!({"16": {"Tla": "LEC", "Unknown": "x"}})),
        ];
        let drivers = driver_list(&updates);

        let numbers: Vec<&str> = drivers.iter().map(|d| d.racing_number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "44", "16"]);
        assert_eq!(drivers[0].tla.as_deref(), Some("VER"));
        assert_eq!(drivers[0].team_name.as_deref(), Some("Red Bull Racing"));
        assert_eq!(drivers[0].line, Some(2));
        assert_eq!(drivers[1].line, Some(1));
        assert_eq!(drivers[1].team_colour.as_deref(), Some("6CD3BF"));
        assert_eq!(drivers[2].full_name, None);
    }

    #[test]
    fn test_session_info_dates_and_offset() {
        let updates = vec![
            update(0, json!({
                "Meeting": {"Name": "Bahrain Grand Prix", "Circuit": {"Key": 63, "ShortName": "Sakhir"}},
                "Key": 7953,
                "Type": "Race",
                "Name": "Race",
                "StartDate": "2023-03-05T18:00:00",
                "EndDate": "2023-03-05T20:00:00",
                "GmtOffset": "03:00:00",
                "Path": "2023/2023-03-05_Bahrain_Grand_Prix/2023-03-05_Race/"
            })),
            update(5, json!({"Name": "ignored"})),
        ];
        let info = session_info(&updates).unwrap();

        assert_eq!(info.key, Some(7953));
        assert_eq!(info.name.as_deref(), Some("Race"));
        assert_eq!(info.meeting_name.as_deref(), Some("Bahrain Grand Prix"));
        assert_eq!(info.circuit.as_deref(), Some("Sakhir"));
        assert_eq!(info.gmt_offset, Some(TimeDelta::hours(3)));
        let (start, end) = (info.start_date.unwrap(), info.end_date.unwrap());
        assert_eq!(end - start, TimeDelta::hours(2));

        assert_eq!(session_info(&[]), None);
    }

    #[test]
    fn test_object_stints_in_numeric_order() {
        let updates = vec![update(
            5,
            json!({"Lines": {"16": {"Stints": {
                "10": {"Compound": "SOFT"},
                "2": {"Compound": "MEDIUM"},
                "1": {"Compound": "HARD"}
            }}}}),
        )];
        let numbers: Vec<u32> = stints(&updates).iter().map(|s| s.stint).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn test_status_pages() {
        let updates = vec![
            update(1, json!({"Status": "1", "Message": "AllClear"})),
            update(2, json!({"Status": "4"})),
        ];
        let track = track_status(&updates);
        assert_eq!(track[1].status, "4");
        assert_eq!(track[1].message, "");

        let session = session_status(&[update(1, json!({"Status": "Started"})), update(2, json!({}))]);
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].status, "Started");
    }

    #[test]
    fn test_lap_count_partial_values() {
        let counts = lap_count(&[update(1, json!({"TotalLaps": 57, "CurrentLap": 1})), update(2, json!({"CurrentLap": 2}))]);
        assert_eq!(counts[0].total_laps, Some(57));
        assert_eq!(counts[1].total_laps, None);
        assert_eq!(counts[1].current_lap, Some(2));
    }

    #[test]
    fn test_weather_defaults() {
        let weather = weather(&[update(60, json!({"AirTemp": "18.4", "Rainfall": "1", "WindDirection": "212"}))]);
        assert_eq!(weather[0].air_temp, 18.4);
        assert!(weather[0].rainfall);
        assert_eq!(weather[0].wind_direction, 212);
        assert_eq!(weather[0].humidity, 0.0);
    }

    #[test]
    fn test_race_control_messages() {
        let updates = vec![
            update(1, json!({"Messages": [{"Utc": "2024-03-02T15:00:00", "Category": "Flag", "Flag": "GREEN", "Scope": "Track"}]})),
            update(2, json!({"Messages": {"5": {"Utc": "2024-03-02T15:20:11", "Category": "Other", "Message": "CAR 16 UNDER INVESTIGATION", "Lap": 12, "Sector": "x"}}})),
        ];
        let messages = race_control(&updates);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].flag.as_deref(), Some("GREEN"));
        assert_eq!(messages[1].lap, Some(12));
        assert_eq!(messages[1].sector, None);
        assert!(messages[1].utc.is_some());
    }
}
