use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use thiserror::Error;

use crate::compression::window::WindowOptions;

pub mod window;

/// The general purpose compressor applied after run-length coding.
///
/// The two backends do not share a wire format. A container records no
/// backend tag, so it must be read with the backend it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The built in windowed LZ77 compressor
    Window(WindowOptions),

    /// zlib-wrapped deflate at the given level (0-9)
    Deflate { level: u32 },
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Window(WindowOptions::default())
    }
}

impl Backend {
    /// Compress a run stream into a block
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let block = match self {
            Backend::Window(options) => window::compress(data, options),
            Backend::Deflate { level } => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new((*level).min(9)));
                encoder.write_all(data)?;
                encoder.finish()?
            }
        };

        debug!("compressed {} bytes into {} bytes", data.len(), block.len());
        Ok(block)
    }

    /// Decompress a block back into a run stream.
    ///
    /// The window backend never fails.
    pub fn decompress(&self, block: &[u8]) -> Result<Vec<u8>, CompressionError> {
        match self {
            Backend::Window(_) => Ok(window::decompress(block)),
            Backend::Deflate { .. } => {
                let mut output = Vec::new();
                ZlibDecoder::new(block).read_to_end(&mut output)?;
                Ok(output)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("deflate stream error: {0}")]
    Deflate(#[from] std::io::Error),
}

/// Size of some content before and after compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    /// The size of the original uncompressed data
    pub raw_size: usize,

    /// The size of the data when compressed
    pub compressed_size: usize,
}

impl CompressionStats {
    /// Percentage of the raw size saved by compression. Negative when the
    /// output grew.
    pub fn ratio(&self) -> f64 {
        if self.raw_size == 0 {
            return 0.0;
        }

        (1.0 - self.compressed_size as f64 / self.raw_size as f64) * 100.0
    }
}
