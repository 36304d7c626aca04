//! Time reconciliation of one driver's laps.
//!
//! Lap and sector times are taken as truth. Session timestamps are not:
//! each one arrives with its own network latency, so they are re-derived
//! from redundant sources and from neighbouring laps. A timestamp is only
//! ever moved earlier, because data can arrive late but never early.

use contracts::{DriverId, IntegrityError, IntegrityReason, LapRecord, SessionTime};
use tracing::{instrument, warn};

use crate::laps::{BestLapObservation, DriverLaps};

/// A driver's reconciled laps and the problems found on the way
#[derive(Debug, Clone, Default)]
pub struct ReconciledLaps {
    pub laps: Vec<LapRecord>,
    pub integrity_errors: Vec<IntegrityError>,
}

/// Reconciles the timestamps of one driver's laps.
pub struct TimeReconciler<'a> {
    driver: &'a DriverId,
    errors: Vec<IntegrityError>,
}

impl<'a> TimeReconciler<'a> {
    pub fn new(driver: &'a DriverId) -> Self {
        Self {
            driver,
            errors: Vec::new(),
        }
    }

    /// Run every timestamp pass over `laps`, returning the integrity errors.
    ///
    /// Running this again on its own output changes nothing.
    pub fn reconcile(mut self, laps: &mut Vec<LapRecord>) -> Vec<IntegrityError> {
        self.check_sector_sums(laps);
        self.earliest_trigger(laps);
        close_trailing_lap(laps);
        if !laps.is_empty() {
            self.close_backward(laps);
            close_forward(laps);
        }
        self.errors
    }

    fn flag(&mut self, laps: &[LapRecord], index: usize, reason: IntegrityReason) {
        let lap_number = laps
            .get(index)
            .and_then(|lap| lap.lap_number)
            .unwrap_or(index as u32 + 1);
        self.errors
            .push(IntegrityError::new(self.driver.clone(), lap_number, reason));
    }

    /// Clear lap times shorter than their sectors, then recover values the
    /// feed did not resend because they equalled the previous lap's.
    fn check_sector_sums(&mut self, laps: &mut [LapRecord]) {
        for i in 0..laps.len() {
            if let (Some(sum), Some(lap_time)) = (laps[i].sector_sum(), laps[i].lap_time) {
                if sum > lap_time {
                    laps[i].lap_time = None;
                    self.flag(laps, i, IntegrityReason::SectorSumExceedsLapTime);
                }
            }

            if i == 0 {
                continue;
            }
            let previous = laps[i - 1].clone();
            recover_repeated_value(&previous, &mut laps[i]);
        }
    }

    /// Lap end is sent three ways: sector 3 session time, sector 2 session
    /// time plus sector 3, sector 1 session time plus sectors 2 and 3. The
    /// earliest derivation wins.
    fn earliest_trigger(&mut self, laps: &mut [LapRecord]) {
        for i in 0..laps.len() {
            let lap = &laps[i];
            let mut earliest = lap.end_time;
            let mut tail = SessionTime::zero();

            let derivations = [
                (Some(SessionTime::zero()), lap.sector_3_session_time),
                (lap.sector_3_time, lap.sector_2_session_time),
                (lap.sector_2_time, lap.sector_1_session_time),
            ];
            for (sector_time, session_time) in derivations {
                let Some(session_time) = session_time else {
                    continue;
                };
                // a missing sector breaks every later derivation
                let Some(sector_time) = sector_time else {
                    break;
                };
                tail += sector_time;
                let candidate = session_time + tail;
                if earliest.map_or(true, |current| candidate < current) {
                    earliest = Some(candidate);
                }
            }

            let previous_end = if i > 0 { laps[i - 1].end_time } else { None };
            if let (Some(candidate), Some(previous)) = (earliest, previous_end) {
                if candidate < previous {
                    self.flag(laps, i, IntegrityReason::TimeOrderingViolation);
                    continue;
                }
            }
            laps[i].end_time = earliest;
        }
    }

    /// Pull earlier lap ends back to `end - lap_time` of the following lap.
    fn close_backward(&mut self, laps: &mut [LapRecord]) {
        for i in (1..laps.len()).rev() {
            let (Some(end), Some(lap_time)) = (laps[i].end_time, laps[i].lap_time) else {
                continue;
            };
            let start = end - lap_time;
            if !laps[i - 1].end_time.is_some_and(|previous| start < previous) {
                continue;
            }
            if i > 1 && laps[i - 2].end_time.is_some_and(|before| start < before) {
                self.flag(laps, i, IntegrityReason::TimeOrderingViolation);
            } else {
                laps[i - 1].end_time = Some(start);
            }
        }
    }
}

/// Fill a lap time or a single sector time that the feed left out because
/// it repeated the previous lap's value.
fn recover_repeated_value(previous: &LapRecord, lap: &mut LapRecord) {
    let sectors = lap.sectors();
    let missing: Vec<usize> = (0..3).filter(|&s| sectors[s].is_none()).collect();

    match (missing.as_slice(), lap.lap_time) {
        ([], None) => {
            if previous.lap_time.is_some() && previous.lap_time == lap.sector_sum() {
                lap.lap_time = previous.lap_time;
            }
        }
        (&[gap], Some(lap_time)) => {
            let known: SessionTime = sectors.iter().flatten().copied().sum();
            let derived = lap_time - known;
            if previous.sectors()[gap] == Some(derived) {
                match gap {
                    0 => lap.sector_1_time = Some(derived),
                    1 => lap.sector_2_time = Some(derived),
                    _ => lap.sector_3_time = Some(derived),
                }
            }
        }
        _ => {}
    }
}

/// A final lap without an end (usually an in-lap) ends at its pit entry or
/// is dropped.
fn close_trailing_lap(laps: &mut Vec<LapRecord>) {
    let Some(last) = laps.last_mut() else {
        return;
    };
    if last.end_time.is_some() {
        return;
    }
    match last.pit_in_time {
        Some(pit_in) => last.end_time = Some(pit_in),
        None => {
            laps.pop();
        }
    }
}

/// Re-derive lap `i + 1` timestamps from lap `i`'s end, keeping only
/// earlier values.
fn close_forward(laps: &mut [LapRecord]) {
    for i in 0..laps.len().saturating_sub(1) {
        let next = &laps[i + 1];
        let (Some(start), Some(lap_time), Some(s1), Some(s2), Some(s3)) = (
            laps[i].end_time,
            next.lap_time,
            next.sector_1_time,
            next.sector_2_time,
            next.sector_3_time,
        ) else {
            continue;
        };

        let next = &mut laps[i + 1];
        lower(&mut next.end_time, start + lap_time);
        lower(&mut next.sector_1_session_time, start + s1);
        lower(&mut next.sector_2_session_time, start + s1 + s2);
        lower(&mut next.sector_3_session_time, start + s1 + s2 + s3);
    }
}

/// Replace a known timestamp with `candidate` if that is earlier.
fn lower(slot: &mut Option<SessionTime>, candidate: SessionTime) {
    if slot.is_some_and(|current| candidate < current) {
        *slot = Some(candidate);
    }
}

/// Flag personal bests from the `BestLapTime` history.
///
/// After a lap is deleted the feed resends the previous best, so walking each
/// sub-session backwards and skipping values faster than ones already seen
/// recovers the bests that stood. Best effort: only deletions made before
/// the next best was set are caught.
pub fn mark_personal_bests(
    laps: &mut [LapRecord],
    observations: &[BestLapObservation],
    session_splits: &[SessionTime],
) {
    let mut session = session_splits.len().saturating_sub(1);
    let mut standing: Vec<SessionTime> = Vec::new();

    for observation in observations.iter().rev() {
        if session_splits
            .get(session)
            .is_some_and(|start| observation.time < *start)
        {
            session = session.saturating_sub(1);
            standing.clear();
        }

        if let Some(fastest) = standing.iter().min() {
            if standing.contains(&observation.lap_time) || observation.lap_time < *fastest {
                continue;
            }
        }
        standing.push(observation.lap_time);

        if let Some(lap) = laps
            .iter_mut()
            .find(|lap| lap.lap_time == Some(observation.lap_time))
        {
            lap.is_personal_best = true;
        }
    }
}

/// Count pit stops from the first lap, which may include trips through the
/// pit lane on the way to the grid, and drop a grid-lap pit entry that
/// precedes the pit exit.
pub fn normalize_pit_stops(laps: &mut [LapRecord]) {
    let Some(first) = laps.first_mut() else {
        return;
    };
    if let (Some(pit_in), Some(pit_out)) = (first.pit_in_time, first.pit_out_time) {
        if pit_in < pit_out {
            first.pit_in_time = None;
        }
    }

    let Some(offset) = laps[0].pit_stop_count else {
        return;
    };
    for lap in laps.iter_mut() {
        lap.pit_stop_count = lap.pit_stop_count.map(|n| n.saturating_sub(offset));
    }
}

/// Reconcile, flag personal bests and normalize pit stops for one driver.
#[instrument(
    level = "debug",
    name = "lap_reconcile",
    skip(driver_laps),
    fields(driver = %driver_laps.driver, laps = driver_laps.laps.len())
)]
pub fn finalize_laps(driver_laps: DriverLaps) -> ReconciledLaps {
    let DriverLaps {
        driver,
        mut laps,
        best_laps,
        session_splits,
        ..
    } = driver_laps;

    let integrity_errors = TimeReconciler::new(&driver).reconcile(&mut laps);
    mark_personal_bests(&mut laps, &best_laps, &session_splits);
    normalize_pit_stops(&mut laps);

    if !integrity_errors.is_empty() {
        let near: Vec<u32> = integrity_errors.iter().map(|e| e.lap_number).collect();
        warn!(
            driver = %driver,
            count = integrity_errors.len(),
            laps = ?near,
            "encountered {} timing integrity error(s) near lap(s) {:?}",
            integrity_errors.len(),
            near
        );
    }

    ReconciledLaps {
        laps,
        integrity_errors,
    }
}
