//! Engine metrics collection
//!
//! Records per-session metrics from an [`EngineReport`] and aggregates them
//! across sessions for a summary at the end of a batch.

use std::collections::HashMap;

use contracts::{session_time::as_secs_f64, EngineReport, IntegrityReason, SessionTiming};
use metrics::{counter, gauge, histogram};

/// Record the metrics of one engine run.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_engine_metrics;
///
/// let session = engine.run(&pages)?;
/// record_engine_metrics(&session.report);
/// ```
pub fn record_engine_metrics(report: &EngineReport) {
    gauge!("livetiming_session_drivers").set(report.drivers as f64);

    for reason in [
        IntegrityReason::SectorSumExceedsLapTime,
        IntegrityReason::TimeOrderingViolation,
    ] {
        let count = report.integrity_count(reason);
        if count > 0 {
            counter!("livetiming_integrity_errors_total", "reason" => reason.as_str())
                .increment(count as u64);
        }
    }

    for stats in &report.decode {
        counter!("livetiming_records_total", "page" => stats.page.clone())
            .increment(stats.total_records as u64);
        if stats.errors > 0 {
            counter!("livetiming_record_errors_total", "page" => stats.page.clone())
                .increment(stats.errors as u64);
        }
    }

    if report.stale_updates > 0 {
        counter!("livetiming_stale_updates_total").increment(report.stale_updates);
    }

    if report.alignment.applied {
        counter!("livetiming_alignment_applied_total").increment(1);
        for shift in &report.alignment.shifts {
            histogram!("livetiming_alignment_shift_ms").record(as_secs_f64(shift.shift).abs() * 1000.0);
        }
    } else {
        counter!("livetiming_alignment_skipped_total").increment(1);
    }

    if !report.non_boolean_brake.is_empty() {
        counter!("livetiming_non_boolean_brake_drivers_total")
            .increment(report.non_boolean_brake.len() as u64);
    }
}

/// Record the table sizes of one session together with its report.
pub fn record_session_metrics(session: &SessionTiming) {
    gauge!("livetiming_session_laps").set(session.laps.len() as f64);
    gauge!("livetiming_session_stream_samples").set(session.stream.len() as f64);
    record_engine_metrics(&session.report);
}

/// Record how long one session took to process
pub fn record_session_latency_ms(latency_ms: f64) {
    histogram!("livetiming_session_latency_ms").record(latency_ms);
}

/// In-memory aggregation over many sessions
#[derive(Debug, Clone, Default)]
pub struct EngineMetricsAggregator {
    pub sessions: u64,
    pub laps: u64,
    pub total_records: u64,
    pub record_errors: u64,
    pub stale_updates: u64,
    pub sessions_aligned: u64,
    pub padded_channels: u64,
    /// Absolute alignment shifts, in milliseconds
    pub shift_stats: RunningStats,
    pub laps_per_session: RunningStats,
    pub integrity_counts: HashMap<IntegrityReason, u64>,
}

impl EngineMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, session: &SessionTiming) {
        let report = &session.report;
        self.sessions += 1;
        self.laps += session.laps.len() as u64;
        self.laps_per_session.push(session.laps.len() as f64);
        self.total_records += report.decode.iter().map(|d| d.total_records as u64).sum::<u64>();
        self.record_errors += report.decode_errors() as u64;
        self.stale_updates += report.stale_updates;
        self.padded_channels += report.incomplete_channels.len() as u64;

        for error in &report.integrity_errors {
            *self.integrity_counts.entry(error.reason).or_insert(0) += 1;
        }

        if report.alignment.applied {
            self.sessions_aligned += 1;
            for shift in &report.alignment.shifts {
                self.shift_stats.push(as_secs_f64(shift.shift).abs() * 1000.0);
            }
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            sessions: self.sessions,
            laps: self.laps,
            record_errors: self.record_errors,
            error_rate: if self.total_records > 0 {
                self.record_errors as f64 / self.total_records as f64 * 100.0
            } else {
                0.0
            },
            stale_updates: self.stale_updates,
            sessions_aligned: self.sessions_aligned,
            padded_channels: self.padded_channels,
            alignment_shift_ms: StatsSummary::from(&self.shift_stats),
            laps_per_session: StatsSummary::from(&self.laps_per_session),
            integrity_counts: self.integrity_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub sessions: u64,
    pub laps: u64,
    pub record_errors: u64,
    pub error_rate: f64,
    pub stale_updates: u64,
    pub sessions_aligned: u64,
    pub padded_channels: u64,
    pub alignment_shift_ms: StatsSummary,
    pub laps_per_session: StatsSummary,
    pub integrity_counts: HashMap<IntegrityReason, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Timing Metrics Summary ===")?;
        writeln!(f, "Sessions: {}", self.sessions)?;
        writeln!(f, "Laps: {}", self.laps)?;
        writeln!(
            f,
            "Record errors: {} ({:.2}%)",
            self.record_errors, self.error_rate
        )?;
        writeln!(f, "Stale updates: {}", self.stale_updates)?;
        writeln!(f, "Sessions aligned: {}", self.sessions_aligned)?;
        writeln!(f, "Padded channels: {}", self.padded_channels)?;
        writeln!(f, "Alignment shift (ms): {}", self.alignment_shift_ms)?;
        writeln!(f, "Laps per session: {}", self.laps_per_session)?;

        if !self.integrity_counts.is_empty() {
            writeln!(f, "Integrity errors:")?;
            let mut counts: Vec<_> = self.integrity_counts.iter().collect();
            counts.sort_by_key(|(reason, _)| reason.as_str());
            for (reason, count) in counts {
                writeln!(f, "  {}: {}", reason.as_str(), count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
