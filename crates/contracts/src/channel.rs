//! Channel telemetry contracts (car and position pages).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::session_time::serde_seconds_opt;
use crate::{DriverId, SessionTime};

/// Provenance of a channel table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelSource {
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "pos")]
    Pos,
}

impl ChannelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelSource::Car => "car",
            ChannelSource::Pos => "pos",
        }
    }
}

impl std::fmt::Display for ChannelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a car was on track at the sample instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackPresence {
    OnTrack,
    OffTrack,
}

/// One car telemetry sample.
///
/// `time` is the session time of the enclosing record; padded rows leave it
/// unset and consumers recompute it from `date` and the session origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarFrame {
    #[serde(with = "serde_seconds_opt")]
    pub time: Option<SessionTime>,
    pub date: NaiveDateTime,
    #[serde(rename = "RPM")]
    pub rpm: i64,
    pub speed: i64,
    #[serde(rename = "nGear")]
    pub gear: i64,
    pub throttle: i64,
    pub brake: bool,
    #[serde(rename = "DRS")]
    pub drs: i64,
}

/// One position telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PositionFrame {
    #[serde(with = "serde_seconds_opt")]
    pub time: Option<SessionTime>,
    pub date: NaiveDateTime,
    pub status: Option<TrackPresence>,
    #[serde(rename = "X")]
    pub x: i64,
    #[serde(rename = "Y")]
    pub y: i64,
    #[serde(rename = "Z")]
    pub z: i64,
}

/// Behaviour shared by every frame type that can live in a [`ChannelTable`].
pub trait ChannelFrame: Clone {
    /// Source tag for tables of this frame type
    const SOURCE: ChannelSource;

    /// Wall-clock date of the sample
    fn date(&self) -> NaiveDateTime;

    /// Synthetic frame used to pad a short table up to the reference dates
    fn padding(date: NaiveDateTime) -> Self;
}

impl ChannelFrame for CarFrame {
    const SOURCE: ChannelSource = ChannelSource::Car;

    fn date(&self) -> NaiveDateTime {
        self.date
    }

    fn padding(date: NaiveDateTime) -> Self {
        Self {
            time: None,
            date,
            rpm: 0,
            speed: 0,
            gear: 0,
            throttle: 0,
            brake: false,
            drs: 0,
        }
    }
}

impl ChannelFrame for PositionFrame {
    const SOURCE: ChannelSource = ChannelSource::Pos;

    fn date(&self) -> NaiveDateTime {
        self.date
    }

    fn padding(date: NaiveDateTime) -> Self {
        Self {
            time: None,
            date,
            status: Some(TrackPresence::OffTrack),
            x: 0,
            y: 0,
            z: 0,
        }
    }
}

/// Ordered samples of one driver from one channel page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTable<F> {
    pub driver: DriverId,
    pub source: ChannelSource,
    pub frames: Vec<F>,
}

impl<F: ChannelFrame> ChannelTable<F> {
    pub fn new(driver: DriverId) -> Self {
        Self {
            driver,
            source: F::SOURCE,
            frames: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
