//! Encoding of rasters into image units.
//!
//! The first image of a stream becomes the primary unit (SIMPLE); every
//! later image becomes an IMAGE extension with its mandatory PCOUNT and
//! GCOUNT cards. 16-bit channels are stored biased by 32768 as signed
//! big-endian samples, with the offset declared in a BZERO card so decoders
//! recover the original values. Color rasters are written as sequential
//! planes (R, G, B, then alpha if present) tagged with CTYPE3 = 'RGB'.

use alloc::string::String;
use alloc::vec::Vec;

use crate::block::{padded_byte_len, DATA_PAD_BYTE};
use crate::error::{Error, Result};
use crate::raster::{Raster, RasterData};
use crate::writer::CardWriter;

/// Bias applied to 16-bit channel values so they fit the signed sample type.
const BZERO_16BIT: i64 = 32768;

/// Stateful image-unit encoder.
#[derive(Debug, Default)]
pub struct Encoder {
    images_written: usize,
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder::default()
    }

    /// Encode one raster as a complete image unit (header plus block-padded
    /// data), re-emitting `metadata` cards verbatim after the mandatory ones.
    pub fn encode(&mut self, raster: &Raster, metadata: &[(String, String)]) -> Result<Vec<u8>> {
        let channels = raster.layout.channels();
        let bits = raster.layout.bits_per_channel();
        if raster.width == 0 || raster.height == 0 {
            return Err(Error::NoImageData);
        }
        let expected = raster
            .width
            .checked_mul(raster.height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(Error::UnsupportedSize)?;
        let depth_matches = match &raster.data {
            RasterData::U8(_) => bits == 8,
            RasterData::U16(_) => bits == 16,
        };
        if raster.data.len() != expected || !depth_matches {
            return Err(Error::UnsupportedPixelFormat);
        }

        let primary = self.images_written == 0;
        let mut out = self.write_header(raster, metadata, primary);
        let header_len = out.len();

        write_planes(raster, &mut out);

        let data_len = out.len() - header_len;
        out.resize(header_len + padded_byte_len(data_len), DATA_PAD_BYTE);
        self.images_written += 1;
        Ok(out)
    }

    fn write_header(
        &self,
        raster: &Raster,
        metadata: &[(String, String)],
        primary: bool,
    ) -> Vec<u8> {
        let channels = raster.layout.channels();
        let bits = raster.layout.bits_per_channel();
        let mut w = CardWriter::new();

        if primary {
            w.logical("SIMPLE", true);
        } else {
            w.string("XTENSION", "IMAGE");
        }
        w.integer("BITPIX", i64::from(bits));
        if channels == 1 {
            w.integer("NAXIS", 2);
            w.integer("NAXIS1", raster.width as i64);
            w.integer("NAXIS2", raster.height as i64);
        } else {
            w.integer("NAXIS", 3);
            w.integer("NAXIS1", raster.width as i64);
            w.integer("NAXIS2", raster.height as i64);
            w.integer("NAXIS3", channels as i64);
        }
        if !primary {
            w.integer("PCOUNT", 0);
            w.integer("GCOUNT", 1);
        }
        if bits == 16 {
            w.integer("BZERO", BZERO_16BIT);
        }
        if channels > 1 {
            w.string("CTYPE3", "RGB");
        }
        for (keyword, value) in metadata {
            w.raw(keyword, value);
        }
        w.finish()
    }
}

/// Append the data segment: sequential channel planes, rows bottom first.
fn write_planes(raster: &Raster, out: &mut Vec<u8>) {
    let width = raster.width;
    let height = raster.height;
    let channels = raster.layout.channels();

    for channel in 0..channels {
        for stream_row in 0..height {
            let src_row = height - 1 - stream_row;
            for col in 0..width {
                let at = (src_row * width + col) * channels + channel;
                match &raster.data {
                    RasterData::U8(data) => out.push(data[at]),
                    RasterData::U16(data) => {
                        let biased = (i32::from(data[at]) - BZERO_16BIT as i32) as i16;
                        out.extend_from_slice(&biased.to_be_bytes());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BLOCK_SIZE, CARD_SIZE};
    use crate::raster::ChannelLayout;
    use alloc::vec;

    fn card_text(buf: &[u8], index: usize) -> &str {
        core::str::from_utf8(&buf[index * CARD_SIZE..(index + 1) * CARD_SIZE])
            .unwrap()
            .trim_end()
    }

    fn gray8(width: usize, height: usize, pixels: &[u8]) -> Raster {
        Raster {
            width,
            height,
            layout: ChannelLayout::Gray8,
            data: RasterData::U8(pixels.to_vec()),
        }
    }

    // ---- headers ----

    #[test]
    fn first_image_is_primary() {
        let mut enc = Encoder::new();
        let unit = enc.encode(&gray8(2, 2, &[1, 2, 3, 4]), &[]).unwrap();
        assert_eq!(card_text(&unit, 0), "SIMPLE  =                    T");
        assert_eq!(card_text(&unit, 1), "BITPIX  = 8");
        assert_eq!(card_text(&unit, 2), "NAXIS   = 2");
        assert_eq!(card_text(&unit, 3), "NAXIS1  = 2");
        assert_eq!(card_text(&unit, 4), "NAXIS2  = 2");
        assert_eq!(card_text(&unit, 5), "END");
    }

    #[test]
    fn second_image_is_an_extension() {
        let mut enc = Encoder::new();
        let raster = gray8(1, 1, &[0]);
        enc.encode(&raster, &[]).unwrap();
        let unit = enc.encode(&raster, &[]).unwrap();
        assert_eq!(card_text(&unit, 0), "XTENSION= 'IMAGE   '");
        assert_eq!(card_text(&unit, 5), "PCOUNT  = 0");
        assert_eq!(card_text(&unit, 6), "GCOUNT  = 1");
    }

    #[test]
    fn gray16_header_declares_bzero() {
        let mut enc = Encoder::new();
        let raster = Raster {
            width: 1,
            height: 1,
            layout: ChannelLayout::Gray16,
            data: RasterData::U16(vec![0]),
        };
        let unit = enc.encode(&raster, &[]).unwrap();
        assert_eq!(card_text(&unit, 5), "BZERO   = 32768");
    }

    #[test]
    fn rgb_header_declares_cube() {
        let mut enc = Encoder::new();
        let raster = Raster {
            width: 1,
            height: 1,
            layout: ChannelLayout::Rgb8,
            data: RasterData::U8(vec![1, 2, 3]),
        };
        let unit = enc.encode(&raster, &[]).unwrap();
        assert_eq!(card_text(&unit, 2), "NAXIS   = 3");
        assert_eq!(card_text(&unit, 5), "NAXIS3  = 3");
        assert_eq!(card_text(&unit, 6), "CTYPE3  = 'RGB     '");
    }

    #[test]
    fn metadata_cards_re_emitted_in_order() {
        let mut enc = Encoder::new();
        let metadata = vec![
            (String::from("TELESCOP"), String::from("'Hale 5m '")),
            (String::from("EXPTIME"), String::from("30.0")),
        ];
        let unit = enc.encode(&gray8(1, 1, &[0]), &metadata).unwrap();
        assert_eq!(card_text(&unit, 5), "TELESCOP= 'Hale 5m '");
        assert_eq!(card_text(&unit, 6), "EXPTIME = 30.0");
        assert_eq!(card_text(&unit, 7), "END");
    }

    // ---- data segments ----

    #[test]
    fn gray8_rows_written_bottom_first() {
        let mut enc = Encoder::new();
        // Raster top row [1, 2], bottom row [3, 4].
        let unit = enc.encode(&gray8(2, 2, &[1, 2, 3, 4]), &[]).unwrap();
        assert_eq!(&unit[BLOCK_SIZE..BLOCK_SIZE + 4], &[3, 4, 1, 2]);
    }

    #[test]
    fn gray16_samples_biased_big_endian() {
        let mut enc = Encoder::new();
        let raster = Raster {
            width: 2,
            height: 1,
            layout: ChannelLayout::Gray16,
            data: RasterData::U16(vec![0, 65535]),
        };
        let unit = enc.encode(&raster, &[]).unwrap();
        let data = &unit[BLOCK_SIZE..BLOCK_SIZE + 4];
        assert_eq!(i16::from_be_bytes([data[0], data[1]]), -32768);
        assert_eq!(i16::from_be_bytes([data[2], data[3]]), 32767);
    }

    #[test]
    fn rgba8_written_as_four_planes() {
        let mut enc = Encoder::new();
        let raster = Raster {
            width: 2,
            height: 1,
            layout: ChannelLayout::Rgba8,
            data: RasterData::U8(vec![1, 3, 5, 7, 2, 4, 6, 8]),
        };
        let unit = enc.encode(&raster, &[]).unwrap();
        assert_eq!(
            &unit[BLOCK_SIZE..BLOCK_SIZE + 8],
            &[1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn unit_length_is_block_aligned() {
        let mut enc = Encoder::new();
        let unit = enc.encode(&gray8(100, 100, &[7; 10_000]), &[]).unwrap();
        assert_eq!(unit.len() % BLOCK_SIZE, 0);
        // One header block plus ceil(10000 / 2880) data blocks.
        assert_eq!(unit.len(), BLOCK_SIZE + 4 * BLOCK_SIZE);
        // Zero padding after the payload.
        assert!(unit[BLOCK_SIZE + 10_000..].iter().all(|&b| b == 0));
    }

    // ---- rejection ----

    #[test]
    fn zero_area_raster_rejected() {
        let mut enc = Encoder::new();
        assert_eq!(
            enc.encode(&gray8(0, 4, &[]), &[]),
            Err(Error::NoImageData)
        );
    }

    #[test]
    fn mismatched_buffer_length_rejected() {
        let mut enc = Encoder::new();
        assert_eq!(
            enc.encode(&gray8(2, 2, &[1, 2, 3]), &[]),
            Err(Error::UnsupportedPixelFormat)
        );
    }

    #[test]
    fn mismatched_depth_rejected() {
        let mut enc = Encoder::new();
        let raster = Raster {
            width: 1,
            height: 1,
            layout: ChannelLayout::Gray16,
            data: RasterData::U8(vec![0, 0]),
        };
        assert_eq!(
            enc.encode(&raster, &[]),
            Err(Error::UnsupportedPixelFormat)
        );
    }

    #[test]
    fn failed_encode_does_not_advance_unit_state() {
        let mut enc = Encoder::new();
        let _ = enc.encode(&gray8(0, 4, &[]), &[]);
        let unit = enc.encode(&gray8(1, 1, &[0]), &[]).unwrap();
        assert_eq!(card_text(&unit, 0), "SIMPLE  =                    T");
    }
}
