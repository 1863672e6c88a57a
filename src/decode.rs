//! Decoding of image-unit data segments into rasters.
//!
//! Grayscale matrices are normalized to the full output range between the
//! data minimum and maximum (explicit DATAMIN/DATAMAX when the header gives
//! them, a scan of the samples otherwise). RGB cubes are stored as
//! sequential color planes and are re-interleaved with the linear
//! BSCALE/BZERO transform applied per channel. Data rows arrive bottom
//! first; the flip to top-first raster rows happens here, exactly once.

use crate::error::{Error, Result};
use crate::header::HeaderRecord;
use crate::raster::{ChannelLayout, Raster, RasterData};
use crate::sample::{Sample, SampleType};

/// Decode one image unit's data segment into a raster.
///
/// `data` must start at the first data byte after the header padding; it may
/// extend past the payload (trailing block padding, further units).
pub fn decode_image(record: &HeaderRecord, data: &[u8]) -> Result<Raster> {
    if record.uses_random_groups || record.naxis() == 0 {
        return Err(Error::NoImageData);
    }
    if record.is_rgb_cube && record.naxis() != 3 {
        return Err(Error::InvalidRgbGeometry);
    }

    match record.naxis() {
        2 => decode_gray(record, data),
        3 if record.is_rgb_cube => decode_rgb(record, data),
        n => Err(Error::UnsupportedDimensions(n)),
    }
}

fn geometry(record: &HeaderRecord) -> Result<(usize, usize)> {
    let width = usize::try_from(record.dims[0]).map_err(|_| Error::UnsupportedSize)?;
    let height = usize::try_from(record.dims[1]).map_err(|_| Error::UnsupportedSize)?;
    if width == 0 || height == 0 {
        return Err(Error::NoImageData);
    }
    Ok((width, height))
}

/// Bytes needed for `planes` full planes of `width * height` samples.
fn required_bytes(width: usize, height: usize, planes: usize, sample_bytes: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(planes))
        .and_then(|n| n.checked_mul(sample_bytes))
        .ok_or(Error::UnsupportedSize)
}

// ── Grayscale ──

fn decode_gray(record: &HeaderRecord, data: &[u8]) -> Result<Raster> {
    match SampleType::from_bitpix(record.bits_per_pixel)? {
        SampleType::U8 => gray_plane::<u8>(record, data),
        SampleType::I16 => gray_plane::<i16>(record, data),
        SampleType::I32 => gray_plane::<i32>(record, data),
        SampleType::I64 => gray_plane::<i64>(record, data),
        SampleType::F32 => gray_plane::<f32>(record, data),
        SampleType::F64 => gray_plane::<f64>(record, data),
    }
}

fn gray_plane<T: Sample>(record: &HeaderRecord, data: &[u8]) -> Result<Raster> {
    let (width, height) = geometry(record)?;
    let needed = required_bytes(width, height, 1, T::BYTES)?;
    if data.len() < needed {
        return Err(Error::UnsupportedSize);
    }
    let data = &data[..needed];

    let (raw_min, raw_max) = raw_bounds::<T>(record, data);

    let layout = if record.bits_per_pixel == 8 {
        ChannelLayout::Gray8
    } else {
        ChannelLayout::Gray16
    };
    let mut raster = Raster::new(width, height, layout);
    // A flat or empty value range renders as all black.
    if raw_max <= raw_min {
        return Ok(raster);
    }

    let max_out = ((1u32 << layout.bits_per_channel()) - 1) as f64;
    let span = raw_max - raw_min;
    let mut write = |index: usize, value: u16| match &mut raster.data {
        RasterData::U8(out) => out[index] = value as u8,
        RasterData::U16(out) => out[index] = value,
    };

    for stream_row in 0..height {
        let out_row = height - 1 - stream_row;
        for col in 0..width {
            let sample = T::from_be(&data[(stream_row * width + col) * T::BYTES..]);
            let value = if sample.is_blank(record.blank) {
                0
            } else {
                clamp_channel((sample.as_f64() - raw_min) * max_out / span, max_out)
            };
            write(out_row * width + col, value);
        }
    }
    Ok(raster)
}

/// Normalization bounds in the raw sample domain.
///
/// Explicit DATAMIN/DATAMAX are physical values; they are mapped back
/// through the linear transform. A zero BSCALE makes that mapping
/// undefined, so the samples are scanned instead.
fn raw_bounds<T: Sample>(record: &HeaderRecord, data: &[u8]) -> (f64, f64) {
    let from_physical = |v: f64| (v - record.bzero) / record.bscale;
    let explicit = if record.bscale != 0.0 {
        (
            record.data_min.map(from_physical),
            record.data_max.map(from_physical),
        )
    } else {
        (None, None)
    };

    match explicit {
        (Some(min), Some(max)) => (min, max),
        (explicit_min, explicit_max) => {
            let (scan_min, scan_max) = scan_bounds::<T>(record, data);
            (
                explicit_min.unwrap_or(scan_min),
                explicit_max.unwrap_or(scan_max),
            )
        }
    }
}

/// Scan min/max over the raw samples, ignoring BLANK (and NaN) pixels.
fn scan_bounds<T: Sample>(record: &HeaderRecord, data: &[u8]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for chunk in data.chunks_exact(T::BYTES) {
        let sample = T::from_be(chunk);
        if sample.is_blank(record.blank) {
            continue;
        }
        let v = sample.as_f64();
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if min > max {
        // Every pixel was BLANK.
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

// ── RGB cubes ──

fn decode_rgb(record: &HeaderRecord, data: &[u8]) -> Result<Raster> {
    let planes = usize::try_from(record.dims[2]).map_err(|_| Error::UnsupportedSize)?;
    if planes != 3 && planes != 4 {
        return Err(Error::InvalidRgbGeometry);
    }

    match record.bits_per_pixel {
        8 => rgb_planes::<u8>(record, data, planes, ChannelLayout::Rgba8),
        16 => rgb_planes::<i16>(record, data, planes, ChannelLayout::Rgba16),
        _ => Err(Error::UnsupportedPixelFormat),
    }
}

fn rgb_planes<T: Sample>(
    record: &HeaderRecord,
    data: &[u8],
    planes: usize,
    layout: ChannelLayout,
) -> Result<Raster> {
    let (width, height) = geometry(record)?;
    let needed = required_bytes(width, height, planes, T::BYTES)?;
    if data.len() < needed {
        return Err(Error::UnsupportedSize);
    }

    let max_out = ((1u32 << layout.bits_per_channel()) - 1) as f64;
    let plane_len = width * height;
    let mut raster = Raster::new(width, height, layout);

    for stream_row in 0..height {
        let out_row = height - 1 - stream_row;
        for col in 0..width {
            let pixel = out_row * width + col;
            for channel in 0..4 {
                let value = if channel < planes {
                    let at = (channel * plane_len + stream_row * width + col) * T::BYTES;
                    let sample = T::from_be(&data[at..]);
                    if sample.is_blank(record.blank) {
                        0
                    } else {
                        clamp_channel(sample.as_f64() * record.bscale + record.bzero, max_out)
                    }
                } else {
                    // No alpha plane in the cube: fully opaque.
                    max_out as u16
                };
                match &mut raster.data {
                    RasterData::U8(out) => out[pixel * 4 + channel] = value as u8,
                    RasterData::U16(out) => out[pixel * 4 + channel] = value,
                }
            }
        }
    }
    Ok(raster)
}

// ── Stream walking ──

/// Walks the image units of a byte stream in order.
///
/// Each unit is a header plus its block-padded data segment; the walker
/// advances by the extent the header declares, so units never have to be
/// decoded to be skipped.
#[derive(Debug, Clone)]
pub struct UnitReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> UnitReader<'a> {
    pub fn new(buf: &'a [u8]) -> UnitReader<'a> {
        UnitReader { buf, offset: 0 }
    }

    /// Byte offset of the next unparsed unit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Parse the next unit's header and borrow its data payload.
    ///
    /// Returns `Ok(None)` at end of stream. The payload slice is the exact
    /// declared extent; the walker itself skips the trailing block padding
    /// (which the final unit of a stream may omit).
    pub fn next_unit(&mut self) -> Result<Option<(HeaderRecord, &'a [u8])>> {
        if self.offset >= self.buf.len() {
            return Ok(None);
        }
        let (record, header_bytes) = crate::header::parse_header(&self.buf[self.offset..])?;
        self.offset += header_bytes;

        let extent = crate::extent::DataExtent::from_header(&record)?;
        let remaining = self.buf.len() - self.offset;
        extent.check_against(remaining)?;

        let data = &self.buf[self.offset..self.offset + extent.data_bytes as usize];
        self.offset += extent.skip_bytes(remaining);
        Ok(Some((record, data)))
    }

    /// Decode the next unit that carries a displayable image, skipping
    /// dataless primaries and random-groups units.
    pub fn next_image(&mut self) -> Result<Option<(HeaderRecord, Raster)>> {
        while let Some((record, data)) = self.next_unit()? {
            let dataless = record.naxis() == 0
                || record.uses_random_groups
                || record.dims.iter().any(|&d| d == 0);
            if dataless {
                continue;
            }
            let raster = decode_image(&record, data)?;
            return Ok(Some((record, raster)));
        }
        Ok(None)
    }
}

/// Round and clamp a channel value to `0..=max_out`.
fn clamp_channel(value: f64, max_out: f64) -> u16 {
    let rounded = libm::round(value);
    if rounded <= 0.0 {
        0
    } else if rounded >= max_out {
        max_out as u16
    } else {
        rounded as u16
    }
}
