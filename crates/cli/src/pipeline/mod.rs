//! Session pipeline: page loading, engine orchestration, run statistics.

mod loader;
mod orchestrator;
mod stats;

pub use loader::load_session;
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::RunStats;
