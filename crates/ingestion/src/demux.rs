//! Record demultiplexer: one raw update log in, one log per driver out.

use std::collections::HashMap;

use contracts::{DriverId, EntityUpdateLog, RawUpdate};
use serde_json::Value;
use tracing::trace;

/// Split updates carrying a `Lines` mapping into per-driver logs.
///
/// Logs are returned in order of each driver's first appearance and keep
/// arrival order internally. Updates without `Lines` are dropped.
pub fn demultiplex(updates: &[RawUpdate]) -> Vec<EntityUpdateLog> {
    let mut logs: Vec<EntityUpdateLog> = Vec::new();
    let mut index: HashMap<DriverId, usize> = HashMap::new();

    for update in updates {
        let Some(Value::Object(lines)) = update.payload.get("Lines") else {
            trace!(timestamp = ?update.timestamp, "update without Lines dropped");
            continue;
        };

        for (driver, payload) in lines {
            let slot = match index.get(driver.as_str()) {
                Some(&slot) => slot,
                None => {
                    let id = DriverId::from(driver.as_str());
                    logs.push(EntityUpdateLog::new(id.clone()));
                    index.insert(id, logs.len() - 1);
                    logs.len() - 1
                }
            };
            logs[slot].push(update.timestamp, payload.clone());
        }
    }

    logs
}
