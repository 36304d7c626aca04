//! Channel page utilities shared by all decoders

use std::collections::HashMap;

use chrono::NaiveDateTime;
use contracts::{ChannelFrame, ChannelTable, DecodeStats, DriverId, IncompleteChannel};
use metrics::counter;
use tracing::{debug, warn};

use crate::codec::decode_payload;
use crate::decoder::ChannelDecoder;
use crate::page::{records, report_decode_stats, split_record};

/// One decoded telemetry page
#[derive(Debug, Clone)]
pub struct ChannelPage<F> {
    /// Per-driver tables, in order of first appearance
    pub tables: Vec<ChannelTable<F>>,
    pub stats: DecodeStats,
    /// Tables that were padded up to the reference length
    pub incomplete: Vec<IncompleteChannel>,
}

impl<F> ChannelPage<F> {
    pub fn decoded_records(&self) -> usize {
        self.stats.decoded
    }
}

/// Decode every record of a compressed telemetry page, then pad short tables.
pub fn decode_channel_page<D: ChannelDecoder>(decoder: &mut D, text: &str) -> ChannelPage<D::Frame> {
    let page = decoder.page();
    let mut stats = DecodeStats::new(page.name());
    let mut tables: Vec<ChannelTable<D::Frame>> = Vec::new();
    let mut index: HashMap<DriverId, usize> = HashMap::new();
    let mut samples = Vec::new();

    for record in records(text) {
        samples.clear();
        let result = split_record(record).and_then(|(time, payload)| {
            let document = decode_payload(payload, page.is_zipped())?;
            decoder.decode_document(time, &document, &mut samples)
        });

        if let Err(e) = result {
            debug!(page = %page, error = %e, "skipping record");
            stats.record_error();
            continue;
        }
        stats.record_ok();

        for (driver, frame) in samples.drain(..) {
            let slot = *index.entry(driver.clone()).or_insert_with(|| {
                tables.push(ChannelTable::new(driver));
                tables.len() - 1
            });
            tables[slot].frames.push(frame);
        }
    }

    report_decode_stats(&stats);
    let incomplete = pad_to_reference(&mut tables);

    ChannelPage {
        tables,
        stats,
        incomplete,
    }
}

/// Pad every table shorter than the longest one against the longest table's
/// dates.
///
/// The reference is the first table with the maximum length. Reference dates
/// that a short table does not already hold (counted per date, so repeated
/// dates are matched one to one) become padding rows; the table is then
/// sorted by date. Padding rows carry no session time.
pub fn pad_to_reference<F: ChannelFrame>(tables: &mut [ChannelTable<F>]) -> Vec<IncompleteChannel> {
    let Some(reference) = tables
        .iter()
        .enumerate()
        .fold(None::<(usize, usize)>, |best, (i, t)| match best {
            Some((_, len)) if t.len() <= len => best,
            _ => Some((i, t.len())),
        })
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };

    let reference_dates: Vec<NaiveDateTime> =
        tables[reference].frames.iter().map(|f| f.date()).collect();
    let reference_len = reference_dates.len();

    let mut incomplete = Vec::new();
    for table in tables.iter_mut() {
        if table.len() >= reference_len {
            continue;
        }

        let mut held: HashMap<NaiveDateTime, usize> = HashMap::new();
        for frame in &table.frames {
            *held.entry(frame.date()).or_insert(0) += 1;
        }

        let before = table.len();
        for date in &reference_dates {
            match held.get_mut(date) {
                Some(count) if *count > 0 => *count -= 1,
                _ => table.frames.push(F::padding(*date)),
            }
        }
        table.frames.sort_by_key(|f| f.date());

        let padded_rows = table.len() - before;
        warn!(
            driver = %table.driver,
            source = %table.source,
            padded_rows,
            "{} data is incomplete for driver {}",
            table.source,
            table.driver
        );
        counter!("livetiming_channel_rows_padded_total", "source" => table.source.as_str())
            .increment(padded_rows as u64);

        incomplete.push(IncompleteChannel {
            driver: table.driver.clone(),
            source: table.source,
            padded_rows,
        });
    }

    incomplete
}
