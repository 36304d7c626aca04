//! Run statistics and the printed summary.

use std::time::Duration;

use contracts::{IntegrityReason, SessionTiming};
use observability::EngineMetricsAggregator;

/// Statistics from one run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Page files found in the session directory
    pub pages_loaded: usize,

    pub bytes_read: u64,

    /// Wall time from loading to the finished result
    pub duration: Duration,

    pub metrics: EngineMetricsAggregator,
}

impl RunStats {
    /// Input throughput in MiB/s
    pub fn throughput_mib(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_read as f64 / (1024.0 * 1024.0) / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self, session: &SessionTiming) {
        let report = &session.report;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Pages loaded: {}", self.pages_loaded);
        println!("   ├─ Throughput: {:.2} MiB/s", self.throughput_mib());
        println!("   ├─ Drivers: {}", report.drivers);
        println!("   ├─ Laps: {}", session.laps.len());
        println!("   ├─ Stream samples: {}", session.stream.len());
        println!("   └─ Sub-sessions: {}", session.session_splits.len().max(1));

        println!("\n🧮 Reconciliation");
        println!(
            "   ├─ Sector sum > lap time: {}",
            report.integrity_count(IntegrityReason::SectorSumExceedsLapTime)
        );
        println!(
            "   ├─ Time ordering violations: {}",
            report.integrity_count(IntegrityReason::TimeOrderingViolation)
        );
        println!("   ├─ Stale updates: {}", report.stale_updates);
        match (&report.alignment.leader, &report.alignment.skipped_reason) {
            (Some(leader), _) if report.alignment.applied => {
                println!("   └─ Clock alignment: leader {}", leader);
            }
            (_, Some(reason)) => println!("   └─ Clock alignment: skipped ({})", reason),
            _ => println!("   └─ Clock alignment: skipped"),
        }

        println!("\n📥 Pages");
        for (i, stats) in report.decode.iter().enumerate() {
            let prefix = if i + 1 == report.decode.len() { "└─" } else { "├─" };
            println!(
                "   {} {}: {} records, {} errors ({:.2}%)",
                prefix,
                stats.page,
                stats.total_records,
                stats.errors,
                stats.error_rate()
            );
        }

        if !session.car.is_empty() || !session.position.is_empty() {
            println!("\n📡 Telemetry");
            println!("   ├─ Car tables: {}", session.car.len());
            println!("   ├─ Position tables: {}", session.position.len());
            println!("   └─ Padded tables: {}", report.incomplete_channels.len());
        }

        if !report.non_boolean_brake.is_empty() {
            println!("\n⚠️  Non-boolean brake data");
            for driver in &report.non_boolean_brake {
                println!("   ├─ {}", driver);
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = RunStats {
            bytes_read: 2 * 1024 * 1024,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.throughput_mib() - 1.0).abs() < 1e-9);
        assert_eq!(RunStats::default().throughput_mib(), 0.0);
    }
}
