//! Position and gap sample stream.

use contracts::{EntityUpdateLog, StreamSample};

use crate::line::TimingLine;

/// Last known value of every stream field
#[derive(Debug, Default)]
struct StreamState {
    position: Option<u32>,
    gap_to_leader: Option<String>,
    interval_to_ahead: Option<String>,
}

impl StreamState {
    /// Overwrite from `line`; returns whether anything changed.
    fn apply(&mut self, line: &TimingLine<'_>) -> bool {
        let mut changed = false;
        changed |= replace(&mut self.position, line.position());
        changed |= replace(&mut self.gap_to_leader, line.gap_to_leader());
        changed |= replace(&mut self.interval_to_ahead, line.interval_to_ahead());
        changed
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(value) if slot.as_ref() != Some(&value) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

/// Build the forward-filled stream for one driver.
///
/// A sample is emitted whenever a field changes and carries the full
/// current state.
pub fn compact_stream(log: &EntityUpdateLog) -> Vec<StreamSample> {
    let mut state = StreamState::default();
    let mut samples = Vec::new();

    for update in &log.updates {
        if !state.apply(&TimingLine::new(&update.payload)) {
            continue;
        }
        samples.push(StreamSample {
            time: update.timestamp,
            driver: log.driver.clone(),
            position: state.position,
            gap_to_leader: state.gap_to_leader.clone(),
            interval_to_ahead: state.interval_to_ahead.clone(),
        });
    }

    samples
}
