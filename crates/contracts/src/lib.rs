//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Session time (`chrono::TimeDelta`) is the offset from the start of the
//!   data stream and is the primary clock for timing data
//! - Channel telemetry additionally carries a wall-clock `date` per sample
//! - Serialized tables express session times as fractional seconds

mod channel;
mod driver_id;
mod engine_config;
mod error;
mod feeds;
mod report;
pub mod session_time;
mod timing;

pub use channel::*;
pub use driver_id::DriverId;
pub use engine_config::*;
pub use error::*;
pub use feeds::*;
pub use report::*;
pub use session_time::{serde_seconds, serde_seconds_opt, SessionTime};
pub use timing::*;
