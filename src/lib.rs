#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod card;
pub mod decode;
pub mod encode;
pub mod error;
pub mod extent;
pub mod header;
pub mod raster;
pub mod sample;
pub mod writer;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use decode::{decode_image, UnitReader};
pub use encode::Encoder;
pub use error::{Error, Result};
pub use header::{parse_header, HeaderRecord};
pub use raster::{ChannelLayout, Raster, RasterData};
