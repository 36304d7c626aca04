//! Cross-driver clock alignment.
//!
//! Each driver's lap end times carry their own reception latency. The gap to
//! the leader published in the stream gives the true spacing at one lap, and
//! every driver is shifted by a single scalar so the lap table agrees with
//! it. Data can arrive late but never early, so every shift is a
//! subtraction.

use std::collections::HashMap;

use chrono::TimeDelta;
use contracts::{AlignmentOutcome, ClockShift, DriverId, LapRecord, SessionTime, StreamSample};
use ingestion::parse_session_time;
use tracing::{debug, instrument, warn};

/// Lap indices of one driver inside the merged lap table
struct DriverRows {
    driver: DriverId,
    rows: Vec<usize>,
}

fn group_by_driver(laps: &[LapRecord]) -> Vec<DriverRows> {
    let mut groups: Vec<DriverRows> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (row, lap) in laps.iter().enumerate() {
        let slot = *index.entry(lap.driver.as_str()).or_insert_with(|| {
            groups.push(DriverRows {
                driver: lap.driver.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

/// Gap string of the stream sample closest in time to `at`
fn gap_near<'a>(samples: &[&'a StreamSample], at: SessionTime) -> Option<&'a str> {
    samples
        .iter()
        .min_by_key(|sample| (sample.time - at).abs())
        .and_then(|sample| sample.gap_to_leader.as_deref())
}

/// Aligns lap end times across drivers using gap-to-leader values.
pub struct ClockAligner<'a> {
    sentinel: &'a str,
}

impl<'a> ClockAligner<'a> {
    /// `sentinel` marks the leader's gap string (e.g. `"LAP 1"`)
    pub fn new(sentinel: &'a str) -> Self {
        Self { sentinel }
    }

    #[instrument(name = "clock_align", skip_all, fields(laps = laps.len(), samples = stream.len()))]
    pub fn align(&self, laps: &mut [LapRecord], stream: &[StreamSample]) -> AlignmentOutcome {
        if stream.iter().all(|s| s.gap_to_leader.is_none()) {
            return skip("no gap to leader data");
        }

        let drivers = group_by_driver(laps);
        let mut samples: HashMap<&str, Vec<&StreamSample>> = HashMap::new();
        for sample in stream {
            samples.entry(sample.driver.as_str()).or_default().push(sample);
        }

        // anchor no later than the first retirement
        let Some(last_common_lap) = drivers
            .iter()
            .filter_map(|d| d.rows.iter().filter_map(|&r| laps[r].lap_number).max())
            .min()
        else {
            return skip("no laps");
        };

        for offset in 0..(last_common_lap as usize).saturating_sub(1) {
            let lap_number = offset as u32 + 1;
            if laps
                .iter()
                .any(|lap| lap.lap_number == Some(lap_number) && lap.pit_in_time.is_some())
            {
                debug!(lap_number, "pit entry on alignment candidate lap");
                continue;
            }

            let mut leader: Option<(usize, SessionTime)> = None;
            let mut expected: Vec<(usize, SessionTime, SessionTime)> = Vec::new();
            for (d, group) in drivers.iter().enumerate() {
                let Some(end) = group.rows.get(offset).and_then(|&r| laps[r].end_time) else {
                    continue;
                };
                let driver_samples = samples
                    .get(group.driver.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let Some(gap) = gap_near(driver_samples, end) else {
                    continue;
                };
                if gap.contains(self.sentinel) {
                    // several leaders: the first one wins
                    if leader.is_none() {
                        leader = Some((d, end));
                    }
                } else if let Some(gap) = parse_session_time(gap) {
                    expected.push((d, gap, end));
                }
            }

            let Some((leader, leader_end)) = leader else {
                continue;
            };
            let deltas: Vec<(usize, TimeDelta)> = expected
                .into_iter()
                .filter(|(d, _, _)| *d != leader)
                .map(|(d, gap, end)| (d, gap - (end - leader_end)))
                .collect();
            let Some(max_delta) = deltas.iter().map(|(_, delta)| *delta).max() else {
                return skip("no usable gaps on the alignment lap");
            };

            // the leader moves back by the largest correction so nobody moves forward
            let correction = max_delta.max(TimeDelta::zero());
            let mut shifts = vec![(leader, -correction)];
            shifts.extend(deltas.iter().map(|&(d, delta)| (d, delta - correction)));

            for &(d, shift) in &shifts {
                for &row in &drivers[d].rows {
                    if let Some(end) = laps[row].end_time.as_mut() {
                        *end += shift;
                    }
                }
            }

            debug!(leader = %drivers[leader].driver, offset, "aligned lap times");
            return AlignmentOutcome {
                applied: true,
                lap_index: Some(offset),
                leader: Some(drivers[leader].driver.clone()),
                shifts: shifts
                    .into_iter()
                    .map(|(d, shift)| ClockShift {
                        driver: drivers[d].driver.clone(),
                        shift,
                    })
                    .collect(),
                skipped_reason: None,
            };
        }

        skip("no suitable lap")
    }
}

fn skip(reason: &str) -> AlignmentOutcome {
    warn!(reason, "skipping lap alignment ({reason})");
    AlignmentOutcome::skipped(reason)
}

/// Align the merged lap table against the stream.
pub fn align_laps(laps: &mut [LapRecord], stream: &[StreamSample], sentinel: &str) -> AlignmentOutcome {
    ClockAligner::new(sentinel).align(laps, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::session_time::from_secs_f64;

    fn t(secs: f64) -> SessionTime {
        from_secs_f64(secs)
    }

    fn laps_for(driver: &str, ends: &[f64]) -> Vec<LapRecord> {
        ends.iter()
            .enumerate()
            .map(|(i, end)| LapRecord {
                lap_number: Some(i as u32 + 1),
                end_time: Some(t(*end)),
                ..LapRecord::new(driver.into())
            })
            .collect()
    }

    fn sample(driver: &str, at: f64, gap: &str) -> StreamSample {
        StreamSample {
            time: t(at),
            driver: driver.into(),
            position: None,
            gap_to_leader: Some(gap.to_string()),
            interval_to_ahead: None,
        }
    }

    fn ends(laps: &[LapRecord], driver: &str) -> Vec<SessionTime> {
        laps.iter()
            .filter(|l| l.driver == driver)
            .filter_map(|l| l.end_time)
            .collect()
    }

    #[test]
    fn test_alignment_matches_published_gaps() {
        let mut laps = laps_for("1", &[90.0, 180.0, 270.0]);
        laps.extend(laps_for("44", &[92.5, 183.0, 273.0]));
        laps.extend(laps_for("16", &[91.0, 181.2, 271.0]));
        let stream = vec![
            sample("1", 90.0, "LAP 2"),
            sample("44", 92.5, "+2.000"),
            sample("16", 91.0, "+1.500"),
        ];

        let outcome = align_laps(&mut laps, &stream, "LAP");
        assert!(outcome.applied);
        assert_eq!(outcome.lap_index, Some(0));
        assert_eq!(outcome.leader.as_deref(), Some("1"));

        let leader = ends(&laps, "1");
        assert_eq!(ends(&laps, "44")[0] - leader[0], t(2.0));
        assert_eq!(ends(&laps, "16")[0] - leader[0], t(1.5));
        // deltas are -0.5 and +0.5: the leader moves back by 0.5
        assert_eq!(leader[0], t(89.5));
        assert!(outcome.shifts.iter().all(|s| s.shift <= TimeDelta::zero()));
    }

    #[test]
    fn test_no_timestamp_increases() {
        let mut laps = laps_for("1", &[90.0, 180.0]);
        laps.extend(laps_for("4", &[95.0, 186.0]));
        laps.extend(laps_for("81", &[93.0, 184.0]));
        let before = laps.clone();
        let stream = vec![
            sample("1", 90.0, "LAP 2"),
            sample("4", 95.0, "+4.000"),
            sample("81", 93.0, "+3.200"),
        ];

        let outcome = align_laps(&mut laps, &stream, "LAP");
        assert!(outcome.applied);
        for (after, before) in laps.iter().zip(&before) {
            assert!(after.end_time <= before.end_time);
        }
    }

    #[test]
    fn test_pit_lap_is_skipped() {
        let mut laps = laps_for("1", &[90.0, 180.0, 270.0]);
        laps.extend(laps_for("44", &[92.0, 183.0, 273.0]));
        laps[3].pit_in_time = Some(t(91.0));
        let stream = vec![
            sample("1", 90.0, "LAP 2"),
            sample("44", 92.0, "+2.000"),
            sample("1", 180.0, "LAP 3"),
            sample("44", 183.0, "+2.500"),
        ];
        let outcome = align_laps(&mut laps, &stream, "LAP");
        assert_eq!(outcome.lap_index, Some(1));
    }

    #[test]
    fn test_skipped_without_leader() {
        let mut laps = laps_for("1", &[90.0, 180.0]);
        laps.extend(laps_for("44", &[92.0, 183.0]));
        let before = laps.clone();
        let stream = vec![sample("1", 90.0, "+0.000"), sample("44", 92.0, "+2.000")];

        let outcome = align_laps(&mut laps, &stream, "LAP");
        assert!(!outcome.applied);
        assert_eq!(outcome.skipped_reason.as_deref(), Some("no suitable lap"));
        assert_eq!(laps, before);
    }

    #[test]
    fn test_first_leader_wins() {
        let mut laps = laps_for("1", &[90.0, 180.0]);
        laps.extend(laps_for("44", &[92.0, 183.0]));
        laps.extend(laps_for("16", &[91.0, 181.0]));
        let stream = vec![
            sample("1", 90.0, "LAP 2"),
            sample("44", 92.0, "LAP 2"),
            sample("16", 91.0, "+1.000"),
        ];
        let outcome = align_laps(&mut laps, &stream, "LAP");
        assert_eq!(outcome.leader.as_deref(), Some("1"));
        assert_eq!(outcome.shifts.len(), 2);
    }
}
