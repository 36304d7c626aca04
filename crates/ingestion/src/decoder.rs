//! Channel decoder trait

use contracts::{ChannelFrame, DriverId, SessionTime};
use serde_json::Value;

use crate::error::Result;
use crate::page::PageKind;

/// Channel decoder trait
///
/// Implement this trait for each telemetry page. An implementation:
/// 1. walks one decompressed record document
/// 2. maps raw channel values onto its frame type
/// 3. emits one `(driver, frame)` pair per driver per sample
///
/// Returning an error rejects the whole record; nothing emitted for it is kept.
pub trait ChannelDecoder {
    /// Frame type produced for every sample
    type Frame: ChannelFrame;

    /// Page this decoder reads
    fn page(&self) -> PageKind;

    /// Decode one record document recorded at session time `time`
    fn decode_document(
        &mut self,
        time: SessionTime,
        document: &Value,
        out: &mut Vec<(DriverId, Self::Frame)>,
    ) -> Result<()>;
}
