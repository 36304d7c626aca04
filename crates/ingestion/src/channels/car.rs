//! Car telemetry decoder (`CarData.z`)

use std::collections::BTreeSet;

use contracts::{CarFrame, DriverId, SessionTime};
use serde_json::{Map, Value};
use tracing::warn;

use super::common::{decode_channel_page, ChannelPage};
use crate::clock::parse_utc;
use crate::decoder::ChannelDecoder;
use crate::error::{IngestionError, Result};
use crate::page::PageKind;
use crate::value::as_i64;

const RPM: &str = "0";
const SPEED: &str = "2";
const GEAR: &str = "3";
const THROTTLE: &str = "4";
const BRAKE: &str = "5";
const DRS: &str = "45";

/// Decoded car page plus drivers whose raw brake channel was not boolean
#[derive(Debug, Clone)]
pub struct CarPage {
    pub page: ChannelPage<CarFrame>,
    pub non_boolean_brake: Vec<DriverId>,
}

/// Car telemetry decoder
pub struct CarDecoder {
    /// Raw brake value meaning "pressed"
    brake_on_value: i64,
    non_boolean_brake: BTreeSet<DriverId>,
}

impl CarDecoder {
    pub fn new(brake_on_value: i64) -> Self {
        Self {
            brake_on_value,
            non_boolean_brake: BTreeSet::new(),
        }
    }

    /// Drivers seen with a raw brake value outside `{0, brake_on_value}`
    pub fn non_boolean_brake(&self) -> impl Iterator<Item = &DriverId> {
        self.non_boolean_brake.iter()
    }

    fn is_non_boolean(&self, brake: i64) -> bool {
        brake != 0 && brake != self.brake_on_value
    }

    /// Remember drivers flagged by an accepted record, warning once per driver.
    fn commit_brake_flags(&mut self, flagged: Vec<(DriverId, i64)>) {
        for (driver, value) in flagged {
            if self.non_boolean_brake.insert(driver.clone()) {
                warn!(
                    driver = %driver,
                    value,
                    "raw brake data contains non-boolean values for driver {driver}"
                );
            }
        }
    }
}

fn car_frame(
    time: SessionTime,
    date: chrono::NaiveDateTime,
    channels: &Map<String, Value>,
) -> CarFrame {
    let channel = |id: &str| channels.get(id).and_then(as_i64).unwrap_or(0);
    CarFrame {
        time: Some(time),
        date,
        rpm: channel(RPM),
        speed: channel(SPEED),
        gear: channel(GEAR),
        throttle: channel(THROTTLE),
        brake: channel(BRAKE) != 0,
        drs: channel(DRS),
    }
}

impl ChannelDecoder for CarDecoder {
    type Frame = CarFrame;

    fn page(&self) -> PageKind {
        PageKind::CarData
    }

    fn decode_document(
        &mut self,
        time: SessionTime,
        document: &Value,
        out: &mut Vec<(DriverId, CarFrame)>,
    ) -> Result<()> {
        let entries = document
            .get("Entries")
            .and_then(Value::as_array)
            .ok_or_else(|| IngestionError::structure("missing Entries array"))?;

        let mut flagged = Vec::new();
        for entry in entries {
            let utc = entry
                .get("Utc")
                .and_then(Value::as_str)
                .ok_or_else(|| IngestionError::structure("entry without Utc"))?;
            let date = parse_utc(utc).ok_or_else(|| {
                IngestionError::structure(format!("invalid Utc date '{utc}'"))
            })?;
            let cars = entry
                .get("Cars")
                .and_then(Value::as_object)
                .ok_or_else(|| IngestionError::structure("entry without Cars"))?;

            for (driver, car) in cars {
                let Some(channels) = car.get("Channels").and_then(Value::as_object) else {
                    continue;
                };
                let driver = DriverId::from(driver.as_str());
                let brake = channels.get(BRAKE).and_then(as_i64).unwrap_or(0);
                if self.is_non_boolean(brake) {
                    flagged.push((driver.clone(), brake));
                }
                out.push((driver, car_frame(time, date, channels)));
            }
        }

        self.commit_brake_flags(flagged);
        Ok(())
    }
}

/// Decode a captured `CarData.z` page.
pub fn decode_car_page(text: &str, brake_on_value: i64) -> CarPage {
    let mut decoder = CarDecoder::new(brake_on_value);
    let page = decode_channel_page(&mut decoder, text);
    CarPage {
        page,
        non_boolean_brake: decoder.non_boolean_brake().cloned().collect(),
    }
}
