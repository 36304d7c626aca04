//! Session orchestrator: load pages, run the engine off the async runtime,
//! record metrics.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use contracts::{EngineConfig, SessionTiming};
use observability::{record_session_latency_ms, record_session_metrics};
use timing_engine::TimingEngine;
use tracing::info;

use super::{load_session, RunStats};
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub engine: EngineConfig,

    pub session_dir: PathBuf,

    /// Processing timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

/// Runs one session end to end
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<(SessionTiming, RunStats)> {
        let start_time = Instant::now();
        let loaded = load_session(&self.config.session_dir).await?;

        let mut stats = RunStats {
            pages_loaded: loaded.files.len(),
            bytes_read: loaded.bytes_read,
            ..Default::default()
        };

        let engine = TimingEngine::new(self.config.engine);
        let pages = loaded.pages;
        let task = tokio::task::spawn_blocking(move || engine.run(&pages));

        let joined = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| CliError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => task.await,
        };
        let session = joined??;

        stats.duration = start_time.elapsed();
        stats.metrics.update(&session);
        record_session_metrics(&session);
        record_session_latency_ms(stats.duration.as_secs_f64() * 1000.0);

        info!(
            laps = session.laps.len(),
            drivers = session.report.drivers,
            duration_ms = stats.duration.as_millis() as u64,
            "Session processed"
        );

        Ok((session, stats))
    }
}
