//! Page catalogue and stream record splitting.
//!
//! A captured page is a `.jsonStream` text file: one record per line, each
//! record a 12 character session clock (`HH:MM:SS.mmm`) directly followed by
//! its payload.

use contracts::{DecodeStats, RawUpdate, SessionTime};
use metrics::counter;
use tracing::{debug, warn};

use crate::clock::parse_session_time;
use crate::codec::decode_payload;
use crate::error::{IngestionError, Result};

/// Length of the leading record timestamp, `len("00:00:00.000")`
pub const TIMESTAMP_LEN: usize = 12;

/// Known live-timing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageKind {
    TimingData,
    TimingAppData,
    CarData,
    Position,
    TrackStatus,
    SessionStatus,
    LapCount,
    WeatherData,
    RaceControlMessages,
    DriverList,
    SessionInfo,
}

impl PageKind {
    pub const ALL: [PageKind; 11] = [
        PageKind::TimingData,
        PageKind::TimingAppData,
        PageKind::CarData,
        PageKind::Position,
        PageKind::TrackStatus,
        PageKind::SessionStatus,
        PageKind::LapCount,
        PageKind::WeatherData,
        PageKind::RaceControlMessages,
        PageKind::DriverList,
        PageKind::SessionInfo,
    ];

    /// Page name as used by the feed
    pub fn name(&self) -> &'static str {
        match self {
            PageKind::TimingData => "TimingData",
            PageKind::TimingAppData => "TimingAppData",
            PageKind::CarData => "CarData.z",
            PageKind::Position => "Position.z",
            PageKind::TrackStatus => "TrackStatus",
            PageKind::SessionStatus => "SessionStatus",
            PageKind::LapCount => "LapCount",
            PageKind::WeatherData => "WeatherData",
            PageKind::RaceControlMessages => "RaceControlMessages",
            PageKind::DriverList => "DriverList",
            PageKind::SessionInfo => "SessionInfo",
        }
    }

    /// File name of the captured stream
    pub fn file_name(&self) -> &'static str {
        match self {
            PageKind::TimingData => "TimingData.jsonStream",
            PageKind::TimingAppData => "TimingAppData.jsonStream",
            PageKind::CarData => "CarData.z.jsonStream",
            PageKind::Position => "Position.z.jsonStream",
            PageKind::TrackStatus => "TrackStatus.jsonStream",
            PageKind::SessionStatus => "SessionStatus.jsonStream",
            PageKind::LapCount => "LapCount.jsonStream",
            PageKind::WeatherData => "WeatherData.jsonStream",
            PageKind::RaceControlMessages => "RaceControlMessages.jsonStream",
            PageKind::DriverList => "DriverList.jsonStream",
            PageKind::SessionInfo => "SessionInfo.jsonStream",
        }
    }

    /// Whether payloads are base64/deflate compressed
    pub fn is_zipped(&self) -> bool {
        matches!(self, PageKind::CarData | PageKind::Position)
    }

    /// Car and position telemetry pages
    pub fn is_telemetry(&self) -> bool {
        self.is_zipped()
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-empty lines of a captured page, with a leading BOM removed.
pub fn records(text: &str) -> impl Iterator<Item = &str> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty())
}

/// Split a record into its session time and payload text.
pub fn split_record(record: &str) -> Result<(SessionTime, &str)> {
    if record.len() < TIMESTAMP_LEN || !record.is_char_boundary(TIMESTAMP_LEN) {
        return Err(IngestionError::TruncatedRecord { len: record.len() });
    }
    let (clock, payload) = record.split_at(TIMESTAMP_LEN);
    let time = parse_session_time(clock).ok_or_else(|| IngestionError::InvalidClock {
        value: clock.to_string(),
    })?;
    Ok((time, payload))
}

/// A timing-style page decoded into raw updates
#[derive(Debug, Clone, Default)]
pub struct DecodedPage {
    pub updates: Vec<RawUpdate>,
    pub stats: DecodeStats,
}

/// Decode every record of a JSON update page.
///
/// Undecodable records are skipped and counted; one warning is logged with
/// the total record count when any record failed.
pub fn decode_update_page(kind: PageKind, text: &str) -> DecodedPage {
    let mut page = DecodedPage {
        updates: Vec::new(),
        stats: DecodeStats::new(kind.name()),
    };

    for record in records(text) {
        match decode_update(record, kind.is_zipped()) {
            Ok(update) => {
                page.stats.record_ok();
                page.updates.push(update);
            }
            Err(e) => {
                debug!(page = %kind, error = %e, "skipping record");
                page.stats.record_error();
            }
        }
    }

    report_decode_stats(&page.stats);
    page
}

fn decode_update(record: &str, zipped: bool) -> Result<RawUpdate> {
    let (time, payload) = split_record(record)?;
    let payload = decode_payload(payload, zipped)?;
    Ok(RawUpdate::new(time, payload))
}

/// Log and count the outcome of decoding one page
pub(crate) fn report_decode_stats(stats: &DecodeStats) {
    counter!("livetiming_records_decoded_total", "page" => stats.page.clone())
        .increment(stats.decoded as u64);

    if stats.errors > 0 {
        counter!("livetiming_records_failed_total", "page" => stats.page.clone())
            .increment(stats.errors as u64);
        warn!(
            page = %stats.page,
            failed = stats.errors,
            total = stats.total_records,
            "failed to decode {} records ({} records total)",
            stats.errors,
            stats.total_records
        );
    }
}
