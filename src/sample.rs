//! Big-endian sample decoding for the six BITPIX encodings.
//!
//! Pixel math is written once, generic over [`Sample`], and monomorphized per
//! image unit after the header names the encoding.

use crate::error::{Error, Result};

/// One of the six data sample encodings a header may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl SampleType {
    /// Map a BITPIX value to its sample encoding.
    pub fn from_bitpix(bitpix: i32) -> Result<SampleType> {
        match bitpix {
            8 => Ok(SampleType::U8),
            16 => Ok(SampleType::I16),
            32 => Ok(SampleType::I32),
            64 => Ok(SampleType::I64),
            -32 => Ok(SampleType::F32),
            -64 => Ok(SampleType::F64),
            other => Err(Error::UnsupportedSampleType(other)),
        }
    }

    /// Sample width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::I16 => 2,
            SampleType::I32 | SampleType::F32 => 4,
            SampleType::I64 | SampleType::F64 => 8,
        }
    }
}

/// A raw data sample readable from the big-endian data segment.
pub trait Sample: Copy {
    /// Sample width in bytes.
    const BYTES: usize;

    /// Decode one sample from the start of `bytes` (at least `BYTES` long).
    fn from_be(bytes: &[u8]) -> Self;

    /// Widen to `f64` for scaling arithmetic.
    fn as_f64(self) -> f64;

    /// Whether this sample matches the header's BLANK sentinel. Float
    /// samples have no BLANK; a NaN plays the same undefined-pixel role.
    fn is_blank(self, blank: Option<i64>) -> bool;
}

macro_rules! int_sample {
    ($ty:ty, $bytes:expr) => {
        impl Sample for $ty {
            const BYTES: usize = $bytes;

            fn from_be(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $bytes];
                raw.copy_from_slice(&bytes[..$bytes]);
                <$ty>::from_be_bytes(raw)
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn is_blank(self, blank: Option<i64>) -> bool {
                blank == Some(self as i64)
            }
        }
    };
}

int_sample!(u8, 1);
int_sample!(i16, 2);
int_sample!(i32, 4);
int_sample!(i64, 8);

macro_rules! float_sample {
    ($ty:ty, $bytes:expr) => {
        impl Sample for $ty {
            const BYTES: usize = $bytes;

            fn from_be(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $bytes];
                raw.copy_from_slice(&bytes[..$bytes]);
                <$ty>::from_be_bytes(raw)
            }

            fn as_f64(self) -> f64 {
                self as f64
            }

            fn is_blank(self, _blank: Option<i64>) -> bool {
                self.is_nan()
            }
        }
    };
}

float_sample!(f32, 4);
float_sample!(f64, 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitpix_mapping() {
        assert_eq!(SampleType::from_bitpix(8), Ok(SampleType::U8));
        assert_eq!(SampleType::from_bitpix(16), Ok(SampleType::I16));
        assert_eq!(SampleType::from_bitpix(32), Ok(SampleType::I32));
        assert_eq!(SampleType::from_bitpix(64), Ok(SampleType::I64));
        assert_eq!(SampleType::from_bitpix(-32), Ok(SampleType::F32));
        assert_eq!(SampleType::from_bitpix(-64), Ok(SampleType::F64));
        assert_eq!(
            SampleType::from_bitpix(24),
            Err(Error::UnsupportedSampleType(24))
        );
        assert_eq!(
            SampleType::from_bitpix(0),
            Err(Error::UnsupportedSampleType(0))
        );
    }

    #[test]
    fn sample_widths_match_bitpix() {
        assert_eq!(SampleType::U8.bytes(), 1);
        assert_eq!(SampleType::I16.bytes(), 2);
        assert_eq!(SampleType::I32.bytes(), 4);
        assert_eq!(SampleType::I64.bytes(), 8);
        assert_eq!(SampleType::F32.bytes(), 4);
        assert_eq!(SampleType::F64.bytes(), 8);
    }

    #[test]
    fn big_endian_integers() {
        assert_eq!(<u8 as Sample>::from_be(&[0xAB]), 0xAB);
        assert_eq!(<i16 as Sample>::from_be(&[0x01, 0x00]), 256);
        assert_eq!(<i16 as Sample>::from_be(&[0xFF, 0xFF]), -1);
        assert_eq!(<i32 as Sample>::from_be(&[0x00, 0x01, 0x00, 0x00]), 65536);
        assert_eq!(
            <i64 as Sample>::from_be(&[0, 0, 0, 0, 0, 0, 0x01, 0x00]),
            256
        );
    }

    #[test]
    fn big_endian_floats() {
        assert_eq!(<f32 as Sample>::from_be(&1.5f32.to_be_bytes()), 1.5);
        assert_eq!(<f64 as Sample>::from_be(&(-2.25f64).to_be_bytes()), -2.25);
    }

    #[test]
    fn extra_trailing_bytes_are_ignored() {
        assert_eq!(<i16 as Sample>::from_be(&[0x00, 0x07, 0xDE, 0xAD]), 7);
    }

    #[test]
    fn integer_blank_match() {
        assert!(5i16.is_blank(Some(5)));
        assert!(!5i16.is_blank(Some(6)));
        assert!(!5i16.is_blank(None));
        assert!((-1i32).is_blank(Some(-1)));
    }

    #[test]
    fn float_blank_is_nan() {
        assert!(f32::NAN.is_blank(None));
        assert!(f64::NAN.is_blank(Some(0)));
        assert!(!1.0f32.is_blank(Some(1)));
    }

    #[test]
    fn widening_preserves_sign() {
        assert_eq!((-300i16).as_f64(), -300.0);
        assert_eq!(200u8.as_f64(), 200.0);
        assert_eq!((-7i64).as_f64(), -7.0);
    }
}
