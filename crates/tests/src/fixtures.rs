//! Synthetic captured pages.
//!
//! A session is described per driver as a list of lap plans; the helpers
//! render the feed updates such a session would produce, in arrival order,
//! as page text the engine can read.

use ingestion::encode_zipped;
use serde_json::{json, Value};

/// One driver's session
pub struct DriverPlan {
    pub number: &'static str,
    /// Reception delay of this driver's timing data, in seconds
    pub lag: f64,
    /// Sector times of each lap
    pub laps: Vec<[f64; 3]>,
    /// `GapToLeader` published after lap `k` (0-based)
    pub gap: fn(usize) -> String,
    pub position: u32,
}

/// Timestamped update of a page
pub type Event = (f64, Value);

/// 12-character session clock, `HH:MM:SS.mmm`
pub fn clock(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round() as i64;
    let ms = total_ms % 1000;
    let s = total_ms / 1000 % 60;
    let m = total_ms / 60_000 % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Sector value as the feed formats it
pub fn seconds(value: f64) -> String {
    format!("{value:.3}")
}

/// Lap time as the feed formats it, `M:SS.mmm`
pub fn lap_time(value: f64) -> String {
    let minutes = (value / 60.0).floor();
    format!("{}:{:06.3}", minutes as i64, value - minutes * 60.0)
}

fn line(driver: &str, fields: Value) -> Value {
    json!({ "Lines": { driver: fields } })
}

/// End time of every lap in `plan`, in session seconds.
pub fn lap_ends(plan: &DriverPlan) -> Vec<f64> {
    let mut end = plan.lag;
    plan.laps
        .iter()
        .map(|sectors| {
            end += sectors.iter().sum::<f64>();
            end
        })
        .collect()
}

/// Timing updates for one driver.
///
/// Sectors arrive as they are completed; lap time, final sector and speed
/// trap at the line; the lap counter 0.1 s later; the gap 0.2 s after that.
pub fn driver_events(plan: &DriverPlan) -> Vec<Event> {
    let n = plan.number;
    let mut events = vec![(
        0.0,
        line(n, json!({"InPit": false, "Position": plan.position.to_string()})),
    )];

    let mut start = plan.lag;
    for (k, sectors) in plan.laps.iter().enumerate() {
        let [s1, s2, s3] = *sectors;
        let end = start + s1 + s2 + s3;
        events.push((
            start + s1,
            line(n, json!({"Sectors": {"0": {"Value": seconds(s1)}}})),
        ));
        events.push((
            start + s1 + s2,
            line(n, json!({"Sectors": {"1": {"Value": seconds(s2)}}})),
        ));
        events.push((
            end,
            line(
                n,
                json!({
                    "Sectors": {"2": {"Value": seconds(s3)}},
                    "LastLapTime": {"Value": lap_time(s1 + s2 + s3)},
                    "Speeds": {"ST": {"Value": "305"}}
                }),
            ),
        ));
        events.push((end + 0.1, line(n, json!({"NumberOfLaps": k + 1}))));
        events.push((end + 0.3, line(n, json!({"GapToLeader": (plan.gap)(k)}))));
        start = end;
    }
    events
}

/// Render events as page text, sorted by time (ties keep insertion order).
pub fn render(mut events: Vec<Event>) -> String {
    events.sort_by(|a, b| a.0.total_cmp(&b.0));
    events
        .iter()
        .map(|(at, payload)| format!("{}{}\r\n", clock(*at), payload))
        .collect()
}

/// Render events with compressed payloads.
pub fn render_zipped(events: &[Event]) -> String {
    events
        .iter()
        .map(|(at, payload)| format!("{}{}\n", clock(*at), encode_zipped(payload).unwrap()))
        .collect()
}

/// Leader "1" and "44" 1.5 s behind on the clock but 1.2 s behind on track.
///
/// Driver "1" sets 1:30.000, then 1:29.000 which is deleted, then 1:31.000.
pub fn two_driver_race() -> (Vec<DriverPlan>, Vec<Event>) {
    let laps = vec![[30.0, 30.0, 30.0], [29.5, 29.5, 30.0], [30.0, 30.0, 31.0]];
    let plans = vec![
        DriverPlan {
            number: "1",
            lag: 0.0,
            laps: laps.clone(),
            gap: |k| format!("LAP {}", k + 1),
            position: 1,
        },
        DriverPlan {
            number: "44",
            lag: 1.5,
            laps,
            gap: |_| "+1.200".to_string(),
            position: 2,
        },
    ];

    let mut events: Vec<Event> = plans.iter().flat_map(driver_events).collect();
    for plan in &plans {
        let ends = lap_ends(plan);
        events.push((ends[0] + 0.1, line(plan.number, json!({"BestLapTime": {"Value": "1:30.000"}}))));
        events.push((ends[1] + 0.1, line(plan.number, json!({"BestLapTime": {"Value": "1:29.000"}}))));
    }
    // lap 2 of driver "1" deleted by race control
    events.push((199.0, line("1", json!({"BestLapTime": {"Value": "1:30.000"}}))));

    (plans, events)
}

/// Car page: "44" is missing from two of five entries and reports a
/// non-boolean brake value.
pub fn car_page() -> String {
    let entries: Vec<Event> = (0..5)
        .map(|i| {
            let utc = format!("2024-03-02T15:00:0{i}.100Z");
            let mut cars = json!({
                "1": {"Channels": {"0": 11000 + i, "2": 290, "3": 7, "4": 100, "5": 0, "45": 12}}
            });
            if i % 2 == 0 {
                let brake = if i == 2 { 42 } else { 100 };
                cars["44"] = json!({"Channels": {"0": 10500, "2": 280, "3": 7, "4": 0, "5": brake}});
            }
            (i as f64 + 0.2, json!({"Entries": [{"Utc": utc, "Cars": cars}]}))
        })
        .collect();
    render_zipped(&entries)
}

/// Position page with both drivers in every entry.
pub fn position_page() -> String {
    let entries: Vec<Event> = (0..3)
        .map(|i| {
            let stamp = format!("2024-03-02T15:00:0{i}.300Z");
            (
                i as f64 + 0.4,
                json!({"Position": [{"Timestamp": stamp, "Entries": {
                    "1": {"Status": "OnTrack", "X": 100 * i, "Y": -50, "Z": 3},
                    "44": {"Status": "OnTrack", "X": 90 * i, "Y": -48, "Z": 3}
                }}]}),
            )
        })
        .collect();
    render_zipped(&entries)
}

#[test]
fn test_clock_formatting() {
    assert_eq!(clock(0.0), "00:00:00.000");
    assert_eq!(clock(90.1), "00:01:30.100");
    assert_eq!(clock(3725.25), "01:02:05.250");
    assert_eq!(lap_time(89.0), "1:29.000");
    assert_eq!(lap_time(91.5), "1:31.500");
}
