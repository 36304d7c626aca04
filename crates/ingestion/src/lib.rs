//! # Ingestion
//!
//! Live-timing page decoding.
//!
//! Responsibilities:
//! - Split captured `.jsonStream` pages into timestamped records
//! - Decode literal and base64/deflate compressed payloads
//! - Demultiplex timing updates into per-driver logs
//! - Decode car and position telemetry into per-driver channel tables
//! - Decode auxiliary feeds (stints, status pages, weather, race control)
//!
//! Bad records never abort a page: they are skipped, counted in
//! [`contracts::DecodeStats`] and reported once per page.
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{decode_update_page, demultiplex, PageKind};
//!
//! let page = decode_update_page(PageKind::TimingData, &text);
//! for log in demultiplex(&page.updates) {
//!     println!("{}: {} updates", log.driver, log.len());
//! }
//! ```

mod channels;
pub mod clock;
mod codec;
mod decoder;
mod demux;
mod error;
pub mod feeds;
mod page;
pub mod value;

// Re-exports
pub use channels::{
    decode_car_page, decode_channel_page, decode_position_page, pad_to_reference, CarDecoder,
    CarPage, ChannelPage, PositionDecoder,
};
pub use clock::{parse_session_time, parse_utc};
pub use codec::{decode_payload, encode_zipped};
pub use decoder::ChannelDecoder;
pub use demux::demultiplex;
pub use error::{IngestionError, Result};
pub use page::{decode_update_page, records, split_record, DecodedPage, PageKind, TIMESTAMP_LEN};
