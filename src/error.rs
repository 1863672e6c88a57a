/// All errors that can occur while parsing or transcoding a FITS image unit.
///
/// Every variant is terminal for the current image unit: the caller decides
/// whether to abandon the stream or skip ahead to the next unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Fewer than 80 bytes were available for a header card.
    MalformedCard,
    /// A mandatory keyword appeared out of the mandated order, or carried
    /// an invalid value in its mandatory slot.
    HeaderSequenceError,
    /// End of buffer before the END card or its trailing block padding.
    TruncatedHeader,
    /// CTYPE3 declared an RGB cube but the axes do not form one.
    InvalidRgbGeometry,
    /// The header describes no pixel matrix (NAXIS = 0 or random groups).
    NoImageData,
    /// Data size overflowed 64 bits or exceeds the remaining input.
    UnsupportedSize,
    /// BITPIX is not one of the six sample encodings.
    UnsupportedSampleType(i32),
    /// The raster layout cannot be represented in a FITS data segment.
    UnsupportedPixelFormat,
    /// NAXIS is outside the {2, 3} range the transcoder accepts.
    UnsupportedDimensions(usize),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MalformedCard => write!(f, "header card shorter than 80 bytes"),
            Error::HeaderSequenceError => write!(f, "mandatory keyword out of order"),
            Error::TruncatedHeader => write!(f, "end of data before END card"),
            Error::InvalidRgbGeometry => write!(f, "RGB cube with invalid geometry"),
            Error::NoImageData => write!(f, "header describes no image data"),
            Error::UnsupportedSize => write!(f, "data size overflows or exceeds input"),
            Error::UnsupportedSampleType(b) => write!(f, "unsupported BITPIX value: {b}"),
            Error::UnsupportedPixelFormat => write!(f, "unsupported pixel format"),
            Error::UnsupportedDimensions(n) => {
                write!(f, "unsupported number of dimensions: {n}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
