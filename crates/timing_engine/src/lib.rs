//! # Timing Engine
//!
//! Live-timing reconciliation engine.
//!
//! Responsibilities:
//! - Rebuild per-lap records from sparse per-driver timing updates
//! - Reconcile lap-end and sector timestamps, flag integrity errors
//! - Align lap clocks across drivers using published gaps to the leader
//! - Build the forward-filled position/gap stream
//! - Orchestrate telemetry and auxiliary feed decoding
//!
//! Per-driver work is independent and runs on a rayon pool; the clock
//! alignment is the single step that needs every driver's laps.
//!
//! ## Usage Example
//!
//! ```ignore
//! use timing_engine::{SessionPages, TimingEngine};
//! use ingestion::PageKind;
//!
//! let pages = SessionPages::new()
//!     .with(PageKind::TimingData, timing_text)
//!     .with(PageKind::CarData, car_text)
//!     .with(PageKind::Position, position_text);
//!
//! let session = TimingEngine::new(config).run(&pages)?;
//! for lap in session.laps_for("44") {
//!     println!("{:?} {:?}", lap.lap_number, lap.lap_time);
//! }
//! ```

mod align;
mod engine;
mod laps;
mod line;
mod reconcile;
mod stream;

// Re-exports
pub use align::{align_laps, ClockAligner};
pub use engine::{SessionPages, TimingEngine};
pub use laps::{reconstruct_laps, BestLapObservation, DriverLaps, LapReconstructor};
pub use line::{SpeedTrap, TimingLine};
pub use reconcile::{finalize_laps, mark_personal_bests, normalize_pit_stops, ReconciledLaps, TimeReconciler};
pub use stream::compact_stream;

// Re-export contracts types
pub use contracts::{EngineConfig, EngineReport, LapRecord, SessionTiming, StreamSample};
