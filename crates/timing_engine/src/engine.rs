//! Engine facade: captured pages in, reconciled session out.

use std::collections::BTreeMap;

use contracts::{
    AlignmentOutcome, CarFrame, ChannelTable, ContractError, DecodeStats, DriverId,
    EngineConfig, EngineReport, EntityUpdateLog, IncompleteChannel, IntegrityError, LapRecord,
    PositionFrame, SessionFeeds, SessionTime, SessionTiming, StreamSample,
};
use ingestion::{
    decode_car_page, decode_position_page, decode_update_page, demultiplex, feeds, ChannelPage,
    PageKind,
};
use metrics::{counter, histogram};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::align::align_laps;
use crate::laps::LapReconstructor;
use crate::reconcile::finalize_laps;
use crate::stream::compact_stream;

/// Captured page texts of one session, keyed by page
#[derive(Debug, Clone, Default)]
pub struct SessionPages {
    pages: BTreeMap<PageKind, String>,
}

impl SessionPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: PageKind, text: impl Into<String>) {
        self.pages.insert(kind, text.into());
    }

    pub fn with(mut self, kind: PageKind, text: impl Into<String>) -> Self {
        self.insert(kind, text);
        self
    }

    pub fn get(&self, kind: PageKind) -> Option<&str> {
        self.pages.get(&kind).map(String::as_str)
    }

    pub fn contains(&self, kind: PageKind) -> bool {
        self.pages.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Everything computed for one driver before the cross-driver steps
#[derive(Debug, Default)]
struct DriverOutcome {
    laps: Vec<LapRecord>,
    integrity_errors: Vec<IntegrityError>,
    stream: Vec<StreamSample>,
    session_splits: Vec<SessionTime>,
    stale_updates: u64,
}

struct Telemetry {
    car: BTreeMap<DriverId, ChannelTable<CarFrame>>,
    position: BTreeMap<DriverId, ChannelTable<PositionFrame>>,
    decode: Vec<DecodeStats>,
    incomplete: Vec<IncompleteChannel>,
    non_boolean_brake: Vec<DriverId>,
}

/// Live-timing reconciliation engine
#[derive(Debug, Clone, Default)]
pub struct TimingEngine {
    config: EngineConfig,
}

impl TimingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile a captured session.
    ///
    /// Fails only when a required page has no usable data. Every other
    /// problem is collected in the returned report.
    #[instrument(name = "timing_engine_run", skip_all, fields(pages = pages.len()))]
    pub fn run(&self, pages: &SessionPages) -> Result<SessionTiming, ContractError> {
        let mut report = EngineReport::default();

        let timing = required_page(pages, PageKind::TimingData)?;
        let decoded = decode_update_page(PageKind::TimingData, timing);
        if decoded.stats.decoded == 0 {
            return Err(ContractError::page_unavailable(
                PageKind::TimingData.name(),
                "no record could be decoded",
            ));
        }
        report.decode.push(decoded.stats);

        let logs = demultiplex(&decoded.updates);
        report.drivers = logs.len();
        let outcomes = self.process_drivers(&logs);

        let mut laps = Vec::new();
        let mut stream = Vec::new();
        let mut session_splits: Vec<SessionTime> = Vec::new();
        for outcome in outcomes {
            if !outcome.laps.is_empty() {
                merge_splits(&mut session_splits, &outcome.session_splits);
            }
            laps.extend(outcome.laps);
            stream.extend(outcome.stream);
            report.integrity_errors.extend(outcome.integrity_errors);
            report.stale_updates += outcome.stale_updates;
        }

        report.alignment = if self.config.alignment.enabled {
            align_laps(&mut laps, &stream, &self.config.alignment.leader_sentinel)
        } else {
            AlignmentOutcome::skipped("disabled")
        };

        let telemetry = self.decode_telemetry(pages)?;
        report.decode.extend(telemetry.decode);
        report.incomplete_channels = telemetry.incomplete;
        report.non_boolean_brake = telemetry.non_boolean_brake;

        let feeds = decode_feeds(pages, &mut report.decode);

        counter!("livetiming_sessions_processed_total").increment(1);
        histogram!("livetiming_laps_per_session").record(laps.len() as f64);
        info!(
            drivers = report.drivers,
            laps = laps.len(),
            samples = stream.len(),
            integrity_errors = report.integrity_errors.len(),
            decode_errors = report.decode_errors(),
            "session reconciled"
        );

        Ok(SessionTiming {
            laps,
            stream,
            car: telemetry.car,
            position: telemetry.position,
            session_splits,
            feeds,
            report,
        })
    }

    /// Per-driver work, on a rayon pool when enabled. Output keeps the
    /// driver order of `logs`.
    fn process_drivers(&self, logs: &[EntityUpdateLog]) -> Vec<DriverOutcome> {
        let runtime = &self.config.runtime;
        if !runtime.parallel {
            return logs.iter().map(|log| self.process_driver(log)).collect();
        }

        let run = || -> Vec<DriverOutcome> {
            logs.par_iter().map(|log| self.process_driver(log)).collect()
        };
        if runtime.worker_threads == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(runtime.worker_threads)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, "failed to build worker pool, using the global pool");
                run()
            }
        }
    }

    fn process_driver(&self, log: &EntityUpdateLog) -> DriverOutcome {
        let reconstructed = LapReconstructor::new(&self.config.timing).reconstruct(log);
        let session_splits = reconstructed.session_splits.clone();
        let stale_updates = reconstructed.stale_updates;
        let reconciled = finalize_laps(reconstructed);

        debug!(driver = %log.driver, laps = reconciled.laps.len(), "driver processed");
        DriverOutcome {
            laps: reconciled.laps,
            integrity_errors: reconciled.integrity_errors,
            stream: compact_stream(log),
            session_splits,
            stale_updates,
        }
    }

    fn decode_telemetry(&self, pages: &SessionPages) -> Result<Telemetry, ContractError> {
        let mut telemetry = Telemetry {
            car: BTreeMap::new(),
            position: BTreeMap::new(),
            decode: Vec::new(),
            incomplete: Vec::new(),
            non_boolean_brake: Vec::new(),
        };
        let settings = &self.config.telemetry;
        if !settings.enabled {
            return Ok(telemetry);
        }

        let car_text = self.telemetry_page(pages, PageKind::CarData)?;
        let position_text = self.telemetry_page(pages, PageKind::Position)?;
        let decode_car = || car_text.map(|text| decode_car_page(text, settings.brake_on_value));
        let decode_position = || position_text.map(decode_position_page);
        let (car, position) = if self.config.runtime.parallel {
            rayon::join(decode_car, decode_position)
        } else {
            (decode_car(), decode_position())
        };

        if let Some(car) = car {
            self.check_decoded(PageKind::CarData, &car.page)?;
            telemetry.non_boolean_brake = car.non_boolean_brake;
            collect_channel_page(
                car.page,
                &mut telemetry.car,
                &mut telemetry.decode,
                &mut telemetry.incomplete,
            );
        }
        if let Some(position) = position {
            self.check_decoded(PageKind::Position, &position)?;
            collect_channel_page(
                position,
                &mut telemetry.position,
                &mut telemetry.decode,
                &mut telemetry.incomplete,
            );
        }

        Ok(telemetry)
    }

    fn telemetry_page<'p>(
        &self,
        pages: &'p SessionPages,
        kind: PageKind,
    ) -> Result<Option<&'p str>, ContractError> {
        if self.config.telemetry.required {
            required_page(pages, kind).map(Some)
        } else {
            Ok(pages.get(kind))
        }
    }

    fn check_decoded<F>(&self, kind: PageKind, page: &ChannelPage<F>) -> Result<(), ContractError> {
        if self.config.telemetry.required && page.decoded_records() == 0 {
            return Err(ContractError::page_unavailable(
                kind.name(),
                "no record could be decoded",
            ));
        }
        Ok(())
    }
}

fn required_page(pages: &SessionPages, kind: PageKind) -> Result<&str, ContractError> {
    match pages.get(kind) {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ContractError::page_unavailable(
            kind.name(),
            "no data for this session",
        )),
    }
}

/// Keep the earliest start per sub-session index.
fn merge_splits(merged: &mut Vec<SessionTime>, driver: &[SessionTime]) {
    for (i, split) in driver.iter().enumerate() {
        match merged.get_mut(i) {
            Some(current) => *current = (*current).min(*split),
            None => merged.push(*split),
        }
    }
}

fn collect_channel_page<F>(
    page: ChannelPage<F>,
    tables: &mut BTreeMap<DriverId, ChannelTable<F>>,
    decode: &mut Vec<DecodeStats>,
    incomplete: &mut Vec<IncompleteChannel>,
) {
    decode.push(page.stats);
    incomplete.extend(page.incomplete);
    for table in page.tables {
        tables.insert(table.driver.clone(), table);
    }
}

/// Auxiliary pages are optional; missing ones leave their feed empty.
fn decode_feeds(pages: &SessionPages, decode: &mut Vec<DecodeStats>) -> SessionFeeds {
    let mut session_feeds = SessionFeeds::default();
    let mut updates = |kind: PageKind| {
        let page = decode_update_page(kind, pages.get(kind)?);
        decode.push(page.stats);
        Some(page.updates)
    };

    if let Some(u) = updates(PageKind::DriverList) {
        session_feeds.drivers = feeds::driver_list(&u);
    }
    if let Some(u) = updates(PageKind::SessionInfo) {
        session_feeds.session_info = feeds::session_info(&u);
    }
    if let Some(u) = updates(PageKind::TimingAppData) {
        session_feeds.stints = feeds::stints(&u);
    }
    if let Some(u) = updates(PageKind::TrackStatus) {
        session_feeds.track_status = feeds::track_status(&u);
    }
    if let Some(u) = updates(PageKind::SessionStatus) {
        session_feeds.session_status = feeds::session_status(&u);
    }
    if let Some(u) = updates(PageKind::LapCount) {
        session_feeds.lap_count = feeds::lap_count(&u);
    }
    if let Some(u) = updates(PageKind::WeatherData) {
        session_feeds.weather = feeds::weather(&u);
    }
    if let Some(u) = updates(PageKind::RaceControlMessages) {
        session_feeds.race_control = feeds::race_control(&u);
    }

    session_feeds
}
