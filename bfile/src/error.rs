use thiserror::Error;

use crate::compression::CompressionError;

/// Errors raised by the container layer.
///
/// The codecs themselves never fail on malformed data; only header or
/// framing corruption surfaces here.
#[derive(Error, Debug)]
pub enum Error {
    /// The input ended before a complete fixed-size header could be read
    #[error("malformed header, expected {expected} bytes but found {found}")]
    MalformedHeader { expected: usize, found: usize },

    /// The 4 byte length prefix of a frame was cut short
    #[error("truncated length field for frame {frame}")]
    TruncatedLength { frame: u32 },

    /// A frame declared more payload bytes than remain in the input
    #[error("frame {frame} declares {declared} bytes but only {available} remain")]
    TruncatedPayload {
        frame: u32,
        declared: usize,
        available: usize,
    },

    #[error("frame {index} requested but the video has {count} frames")]
    FrameOutOfRange { index: usize, count: usize },

    /// The bitplane handed to an encoder does not hold width×height values
    #[error("bitplane holds {found} values, geometry requires {expected}")]
    GeometryMismatch { expected: usize, found: usize },

    /// Multi-frame containers store their geometry in 16 bits
    #[error("dimensions {width}×{height} do not fit in a video header")]
    DimensionsTooLarge { width: u32, height: u32 },

    /// The header describes more pixels than can be held in memory
    #[error("a {width}×{height} bitplane cannot be allocated")]
    BitplaneTooLarge { width: u32, height: u32 },

    #[error("compression backend failed: {0}")]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::MalformedHeader { expected: 12, found: 5 }.to_string(),
            "malformed header, expected 12 bytes but found 5"
        );
        assert_eq!(
            Error::TruncatedPayload { frame: 2, declared: 40, available: 7 }.to_string(),
            "frame 2 declares 40 bytes but only 7 remain"
        );
        assert_eq!(
            Error::BitplaneTooLarge { width: 9, height: 4 }.to_string(),
            "a 9×4 bitplane cannot be allocated"
        );
    }
}
