//! Position telemetry decoder (`Position.z`)

use contracts::{DriverId, PositionFrame, SessionTime, TrackPresence};
use serde_json::Value;

use super::common::{decode_channel_page, ChannelPage};
use crate::clock::parse_utc;
use crate::decoder::ChannelDecoder;
use crate::error::{IngestionError, Result};
use crate::page::PageKind;
use crate::value::as_i64;

/// Position telemetry decoder
#[derive(Debug, Default)]
pub struct PositionDecoder;

impl PositionDecoder {
    pub fn new() -> Self {
        Self
    }
}

/// Digits follow the older mapping (0 on track, anything else off track).
fn track_presence(value: Option<&Value>) -> Option<TrackPresence> {
    match value? {
        Value::Number(n) => n.as_i64().map(|v| {
            if v != 0 {
                TrackPresence::OffTrack
            } else {
                TrackPresence::OnTrack
            }
        }),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            Some(if s.bytes().any(|b| b != b'0') {
                TrackPresence::OffTrack
            } else {
                TrackPresence::OnTrack
            })
        }
        Value::String(s) => match s.as_str() {
            "OnTrack" => Some(TrackPresence::OnTrack),
            "OffTrack" => Some(TrackPresence::OffTrack),
            _ => None,
        },
        _ => None,
    }
}

impl ChannelDecoder for PositionDecoder {
    type Frame = PositionFrame;

    fn page(&self) -> PageKind {
        PageKind::Position
    }

    fn decode_document(
        &mut self,
        time: SessionTime,
        document: &Value,
        out: &mut Vec<(DriverId, PositionFrame)>,
    ) -> Result<()> {
        let samples = document
            .get("Position")
            .and_then(Value::as_array)
            .ok_or_else(|| IngestionError::structure("missing Position array"))?;

        for sample in samples {
            let stamp = sample
                .get("Timestamp")
                .and_then(Value::as_str)
                .ok_or_else(|| IngestionError::structure("sample without Timestamp"))?;
            let date = parse_utc(stamp).ok_or_else(|| {
                IngestionError::structure(format!("invalid Timestamp '{stamp}'"))
            })?;
            let entries = sample
                .get("Entries")
                .and_then(Value::as_object)
                .ok_or_else(|| IngestionError::structure("sample without Entries"))?;

            for (driver, entry) in entries {
                let coordinate = |axis: &str| entry.get(axis).and_then(as_i64);
                let (Some(x), Some(y), Some(z)) = (coordinate("X"), coordinate("Y"), coordinate("Z"))
                else {
                    continue;
                };

                out.push((
                    DriverId::from(driver.as_str()),
                    PositionFrame {
                        time: Some(time),
                        date,
                        status: track_presence(entry.get("Status")),
                        x,
                        y,
                        z,
                    },
                ));
            }
        }
        Ok(())
    }
}

/// Decode a captured `Position.z` page.
pub fn decode_position_page(text: &str) -> ChannelPage<PositionFrame> {
    decode_channel_page(&mut PositionDecoder::new(), text)
}
