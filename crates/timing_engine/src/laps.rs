//! Lap reconstruction from a driver's sparse update log.
//!
//! Two passes over the same log. The first only discovers lap boundaries so
//! that the second can look ahead (a pit exit 0.01s before a boundary belongs
//! to the new lap). The second fills in every lap field.

use chrono::TimeDelta;
use contracts::{DriverId, EntityUpdateLog, LapRecord, SessionTime, TimingConfig};
use tracing::{debug, instrument};

use crate::line::{SpeedTrap, TimingLine};

/// A `BestLapTime` value together with the time it was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestLapObservation {
    pub time: SessionTime,
    pub lap_time: SessionTime,
}

/// Output of lap reconstruction for one driver, before reconciliation
#[derive(Debug, Clone, Default)]
pub struct DriverLaps {
    pub driver: DriverId,
    pub laps: Vec<LapRecord>,
    /// Every `BestLapTime` observation, in arrival order
    pub best_laps: Vec<BestLapObservation>,
    /// Start of each sub-session seen by this driver; always starts at zero
    pub session_splits: Vec<SessionTime>,
    /// Updates dropped because their lap counter went backwards
    pub stale_updates: u64,
}

/// Lap counters shared by both passes.
///
/// `feed_laps` follows the feed's `NumberOfLaps` and never decreases;
/// `laps` counts boundaries the engine actually accepted.
#[derive(Debug, Default)]
struct LapCounters {
    laps: usize,
    feed_laps: i64,
    replaying: bool,
}

impl LapCounters {
    /// Whether an update belongs to a replay of already processed laps.
    ///
    /// Replay starts with a counter below the current one and ends when the
    /// current counter is reported again.
    fn is_stale(&mut self, reported: Option<i64>) -> bool {
        if self.replaying && reported == Some(self.feed_laps) {
            self.replaying = false;
        }
        if reported.is_some_and(|n| n < self.feed_laps) {
            self.replaying = true;
        }
        self.replaying
    }

    fn is_new_lap(&self, reported: Option<i64>) -> bool {
        reported.is_some_and(|n| n > self.feed_laps)
    }
}

/// Per-driver lap reconstructor
pub struct LapReconstructor<'a> {
    config: &'a TimingConfig,
}

impl<'a> LapReconstructor<'a> {
    pub fn new(config: &'a TimingConfig) -> Self {
        Self { config }
    }

    #[instrument(
        level = "debug",
        name = "lap_reconstruct",
        skip(self, log),
        fields(driver = %log.driver, updates = log.len())
    )]
    pub fn reconstruct(&self, log: &EntityUpdateLog) -> DriverLaps {
        let boundaries = self.discover_boundaries(log);
        self.populate(log, boundaries)
    }

    /// Pass 1: provisional lap end times.
    ///
    /// A boundary only counts once the car has left the pits, which drops
    /// the phantom lap the feed sometimes reports before that.
    fn discover_boundaries(&self, log: &EntityUpdateLog) -> Vec<Option<SessionTime>> {
        let mut counters = LapCounters::default();
        let mut left_pits = false;
        let mut boundaries = vec![None];

        for update in &log.updates {
            let line = TimingLine::new(&update.payload);
            let reported = line.number_of_laps();
            if counters.is_stale(reported) {
                continue;
            }

            if line.in_pit() == Some(false) {
                left_pits = true;
            }

            if counters.is_new_lap(reported) {
                counters.feed_laps += 1;
                if left_pits {
                    boundaries[counters.laps] = Some(update.timestamp);
                    counters.laps += 1;
                    boundaries.push(None);
                }
            }
        }

        boundaries
    }

    /// Pass 2: populate lap fields using the boundaries from pass 1.
    fn populate(&self, log: &EntityUpdateLog, boundaries: Vec<Option<SessionTime>>) -> DriverLaps {
        let driver = log.driver.clone();
        let mut rows = LapRows::new(driver.clone(), boundaries);
        let mut counters = LapCounters::default();
        let mut pit_stops: i64 = -1; // the first pit exit is the out lap
        let mut best_laps = Vec::new();
        let mut session_splits = vec![TimeDelta::zero()];
        let mut stale_updates = 0u64;

        for update in &log.updates {
            let time = update.timestamp;
            let line = TimingLine::new(&update.payload);
            let reported = line.number_of_laps();
            if counters.is_stale(reported) {
                stale_updates += 1;
                continue;
            }

            let current = counters.laps;
            let target = if current > 0 && rows.ends_within(current - 1, time, self.config.late_value_window()) {
                current - 1
            } else {
                current
            };

            for index in 0..3 {
                if let Some(value) = line.sector_time(index) {
                    let lap = rows.get_mut(target);
                    match index {
                        0 => {
                            lap.sector_1_time = Some(value);
                            lap.sector_1_session_time = Some(time);
                        }
                        1 => {
                            lap.sector_2_time = Some(value);
                            lap.sector_2_session_time = Some(time);
                        }
                        _ => {
                            lap.sector_3_time = Some(value);
                            lap.sector_3_session_time = Some(time);
                        }
                    }
                }
            }

            if let Some(lap_time) = line.last_lap_time() {
                if lap_time < self.config.max_lap_time() {
                    rows.get_mut(target).lap_time = Some(lap_time);
                }
            }

            for trap in SpeedTrap::ALL {
                let Some(speed) = line.speed(trap) else {
                    continue;
                };
                match trap {
                    SpeedTrap::I1 => rows.get_mut(target).speed_i1 = Some(speed),
                    SpeedTrap::I2 => rows.get_mut(target).speed_i2 = Some(speed),
                    SpeedTrap::FinishLine => rows.get_mut(target).speed_fl = Some(speed),
                    // can arrive early in the new lap, so no offset
                    SpeedTrap::SpeedTrap => rows.get_mut(current).speed_st = Some(speed),
                }
            }

            match line.in_pit() {
                Some(true) => {
                    if pit_stops >= 0 {
                        rows.get_mut(current).pit_in_time = Some(time);
                    }
                }
                Some(false) => {
                    let boundary_imminent = counters.is_new_lap(reported)
                        || rows.ends_within_ahead(current, time, self.config.pit_lookahead());
                    let lap = if boundary_imminent { current + 1 } else { current };
                    rows.get_mut(lap).pit_out_time = Some(time);
                    pit_stops += 1;
                }
                None => {}
            }

            if let Some(lap_time) = line.best_lap_time() {
                best_laps.push(BestLapObservation { time, lap_time });
            }

            if let Some(session) = line.best_lap_times_session() {
                if session + 1 > session_splits.len() {
                    session_splits.push(time);
                }
            }

            if counters.is_new_lap(reported) {
                counters.feed_laps += 1;
                if pit_stops >= 0 {
                    let lap = rows.get_mut(current);
                    lap.end_time = Some(time);
                    lap.lap_number = u32::try_from(current + 1).ok();
                    lap.pit_stop_count = u32::try_from(pit_stops).ok();
                    counters.laps += 1;
                }
            }
        }

        if stale_updates > 0 {
            debug!(driver = %driver, stale_updates, "ignored late data for previously processed laps");
        }

        let laps = if counters.laps == 0 {
            Vec::new()
        } else {
            rows.finish(counters.laps, pit_stops)
        };

        DriverLaps {
            driver,
            laps,
            best_laps,
            session_splits,
            stale_updates,
        }
    }
}

/// Growable lap rows, indexed by the engine's lap counter.
struct LapRows {
    driver: DriverId,
    rows: Vec<LapRecord>,
}

impl LapRows {
    fn new(driver: DriverId, boundaries: Vec<Option<SessionTime>>) -> Self {
        let rows = boundaries
            .into_iter()
            .map(|end_time| LapRecord {
                end_time,
                ..LapRecord::new(driver.clone())
            })
            .collect();
        Self { driver, rows }
    }

    fn get_mut(&mut self, index: usize) -> &mut LapRecord {
        while self.rows.len() <= index {
            self.rows.push(LapRecord::new(self.driver.clone()));
        }
        &mut self.rows[index]
    }

    /// `time` falls less than `window` after the end of lap `index`
    fn ends_within(&self, index: usize, time: SessionTime, window: TimeDelta) -> bool {
        self.rows
            .get(index)
            .and_then(|lap| lap.end_time)
            .is_some_and(|end| time - end < window)
    }

    /// Lap `index` ends less than `window` after `time`
    fn ends_within_ahead(&self, index: usize, time: SessionTime, window: TimeDelta) -> bool {
        self.rows
            .get(index)
            .and_then(|lap| lap.end_time)
            .is_some_and(|end| end - time < window)
    }

    /// Close the open lap and drop the pseudo out-lap.
    fn finish(mut self, completed: usize, pit_stops: i64) -> Vec<LapRecord> {
        let open = completed;
        self.get_mut(open);
        self.rows.truncate(open + 1);

        // the open lap survives only if it holds data
        if self.rows[open].has_timing_data() {
            let lap = &mut self.rows[open];
            lap.lap_number = u32::try_from(open + 1).ok();
            lap.pit_stop_count = u32::try_from(pit_stops).ok();
        } else {
            self.rows.pop();
        }

        if self.rows.first().is_some_and(|lap| !lap.has_timing_data()) {
            self.rows.remove(0);
            for lap in &mut self.rows {
                lap.lap_number = lap.lap_number.map(|n| n.saturating_sub(1));
            }
        }

        self.rows
    }
}

/// Reconstruct a driver's laps with the given windows.
pub fn reconstruct_laps(log: &EntityUpdateLog, config: &TimingConfig) -> DriverLaps {
    LapReconstructor::new(config).reconstruct(log)
}
