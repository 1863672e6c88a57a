//! In-memory raster images exchanged with the transcoder.
//!
//! Rows are stored top-first with interleaved channels, the usual raster
//! convention; the transcoder performs the bottom-first row flip of the
//! container format at its boundary, so a [`Raster`] is always viewer-ready.

use alloc::vec;
use alloc::vec::Vec;

/// Channel arrangement of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray8,
    Gray16,
    Rgb8,
    Rgba8,
    Rgb16,
    Rgba16,
}

impl ChannelLayout {
    /// Interleaved channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Gray8 | ChannelLayout::Gray16 => 1,
            ChannelLayout::Rgb8 | ChannelLayout::Rgb16 => 3,
            ChannelLayout::Rgba8 | ChannelLayout::Rgba16 => 4,
        }
    }

    /// Bits per channel (8 or 16).
    pub fn bits_per_channel(self) -> u32 {
        match self {
            ChannelLayout::Gray8 | ChannelLayout::Rgb8 | ChannelLayout::Rgba8 => 8,
            ChannelLayout::Gray16 | ChannelLayout::Rgb16 | ChannelLayout::Rgba16 => 16,
        }
    }

    /// Whether the layout carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(self, ChannelLayout::Rgba8 | ChannelLayout::Rgba16)
    }
}

/// Channel storage; native-endian, one element per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl RasterData {
    /// Number of channel elements.
    pub fn len(&self) -> usize {
        match self {
            RasterData::U8(v) => v.len(),
            RasterData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded (or to-be-encoded) image.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub layout: ChannelLayout,
    pub data: RasterData,
}

impl Raster {
    /// Allocate a zero-filled raster of the given geometry.
    pub fn new(width: usize, height: usize, layout: ChannelLayout) -> Raster {
        let elements = width * height * layout.channels();
        let data = match layout.bits_per_channel() {
            8 => RasterData::U8(vec![0u8; elements]),
            _ => RasterData::U16(vec![0u16; elements]),
        };
        Raster {
            width,
            height,
            layout,
            data,
        }
    }

    /// Channel elements per row.
    pub fn samples_per_row(&self) -> usize {
        self.width * self.layout.channels()
    }

    /// The 8-bit channel buffer, if this raster is 8-bit.
    pub fn u8_data(&self) -> Option<&[u8]> {
        match &self.data {
            RasterData::U8(v) => Some(v),
            RasterData::U16(_) => None,
        }
    }

    /// The 16-bit channel buffer, if this raster is 16-bit.
    pub fn u16_data(&self) -> Option<&[u16]> {
        match &self.data {
            RasterData::U16(v) => Some(v),
            RasterData::U8(_) => None,
        }
    }

    /// Native-endian byte view of the channel buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            RasterData::U8(v) => v,
            RasterData::U16(v) => bytemuck::cast_slice(v),
        }
    }
}
