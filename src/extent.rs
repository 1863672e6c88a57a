//! Data-segment extent calculation.
//!
//! The byte length of an image unit's data segment follows entirely from the
//! header. All arithmetic is checked in `u64`; any overflow reports
//! [`Error::UnsupportedSize`] rather than wrapping, since a wrapped size
//! would silently mis-position every subsequent unit in the stream.

use crate::block::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::header::HeaderRecord;

/// Byte extents of one image unit's data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataExtent {
    /// Number of data elements (samples) in the segment.
    pub element_count: u64,
    /// Exact payload length in bytes.
    pub data_bytes: u64,
    /// Payload length rounded up to whole 2880-byte blocks. This is the
    /// distance to the next unit's header.
    pub padded_data_bytes: u64,
}

impl DataExtent {
    /// Compute the data extent described by a parsed header.
    ///
    /// Random-groups units exclude the first (zero-length) axis from the
    /// element product and add PCOUNT parameters per the group structure.
    pub fn from_header(record: &HeaderRecord) -> Result<DataExtent> {
        let dims = if record.uses_random_groups {
            record.dims.get(1..).unwrap_or(&[])
        } else {
            &record.dims[..]
        };

        let mut product: u64 = if record.dims.is_empty() { 0 } else { 1 };
        for &dim in dims {
            product = product.checked_mul(dim).ok_or(Error::UnsupportedSize)?;
        }

        let element_count = product
            .checked_mul(record.group_count)
            .and_then(|n| n.checked_add(record.param_count))
            .ok_or(Error::UnsupportedSize)?;

        let bytes_per_sample = u64::from(record.bits_per_pixel.unsigned_abs()) / 8;
        let data_bytes = element_count
            .checked_mul(bytes_per_sample)
            .ok_or(Error::UnsupportedSize)?;

        let block = BLOCK_SIZE as u64;
        let padded_data_bytes = data_bytes
            .checked_add(block - 1)
            .ok_or(Error::UnsupportedSize)?
            / block
            * block;

        Ok(DataExtent {
            element_count,
            data_bytes,
            padded_data_bytes,
        })
    }

    /// Verify that the payload fits in the `remaining` input bytes.
    pub fn check_against(&self, remaining: usize) -> Result<()> {
        if self.data_bytes > remaining as u64 {
            return Err(Error::UnsupportedSize);
        }
        Ok(())
    }

    /// Bytes to skip past this unit's data, capped at the `remaining` input
    /// (the final unit of a stream may omit its trailing padding).
    pub fn skip_bytes(&self, remaining: usize) -> usize {
        let remaining = remaining as u64;
        self.padded_data_bytes.min(remaining) as usize
    }
}
