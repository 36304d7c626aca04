//! Channel telemetry decoders
//!
//! Each decoder turns one compressed telemetry page into per-driver tables
//! of typed frames.

pub mod common;
mod car;
mod position;

pub use car::{decode_car_page, CarDecoder, CarPage};
pub use common::{decode_channel_page, pad_to_reference, ChannelPage};
pub use position::{decode_position_page, PositionDecoder};
