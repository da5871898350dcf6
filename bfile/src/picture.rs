//! The single image (`.bi`) container.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{
    compression::{Backend, CompressionStats},
    error::Error,
    header::ImageHeader,
    operations::{binarize, to_grayscale, Threshold},
    runlength,
};

/// A bitplane together with its geometry.
///
/// The bitmap holds one value per pixel, `0` or `1`, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPicture {
    header: ImageHeader,
    bitmap: Vec<u8>,
}

impl BinaryPicture {
    /// Create a picture from a bitplane of `width × height` values.
    pub fn from_raw(width: u32, height: u32, bitmap: Vec<u8>) -> Result<Self, Error> {
        let header = ImageHeader { width, height };
        if bitmap.len() != header.total_bits() {
            return Err(Error::GeometryMismatch {
                expected: header.total_bits(),
                found: bitmap.len(),
            });
        }

        Ok(Self { header, bitmap })
    }

    /// Create a picture by thresholding row-major 8-bit grayscale pixels.
    pub fn from_grayscale(
        width: u32,
        height: u32,
        gray: &[u8],
        threshold: Threshold,
    ) -> Result<Self, Error> {
        Self::from_raw(width, height, binarize(gray, threshold))
    }

    /// Encode the picture into anything that implements [Write], using
    /// the default window compressor.
    ///
    /// Returns the number of bytes written.
    pub fn encode<O: Write>(&self, output: O) -> Result<usize, Error> {
        self.encode_with(output, &Backend::default())
    }

    /// Encode the picture with a specific compression backend.
    pub fn encode_with<O: Write>(&self, mut output: O, backend: &Backend) -> Result<usize, Error> {
        let runs = runlength::encode(&self.bitmap);
        let block = backend.compress(&runs)?;

        let mut count = self.header.write_into(&mut output)?;
        output.write_all(&block)?;
        count += block.len();

        debug!(
            "encoded {}×{} picture: {} runs bytes, {} compressed bytes",
            self.header.width,
            self.header.height,
            runs.len(),
            block.len()
        );

        Ok(count)
    }

    /// Decode a picture from anything that implements [Read], using the
    /// default window compressor.
    pub fn decode<I: Read>(input: I) -> Result<Self, Error> {
        Self::decode_with(input, &Backend::default())
    }

    /// Decode a picture written with a specific compression backend.
    ///
    /// Everything after the header is taken as the compressed block.
    pub fn decode_with<I: Read>(mut input: I, backend: &Backend) -> Result<Self, Error> {
        let header = ImageHeader::read_from(&mut input)?;

        let mut block = Vec::new();
        input.read_to_end(&mut block)?;

        let runs = backend.decompress(&block)?;
        let bitmap = runlength::try_decode(&runs, header.total_bits()).map_err(|_| {
            Error::BitplaneTooLarge {
                width: header.width,
                height: header.height,
            }
        })?;

        Ok(Self { header, bitmap })
    }

    /// Encode the picture into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        self.encode(&mut output)?;
        Ok(output)
    }

    /// Save the picture to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out_file = BufWriter::new(File::create(path.as_ref())?);
        self.encode(&mut out_file)?;
        out_file.flush()?;

        Ok(())
    }

    pub fn header(&self) -> ImageHeader {
        self.header
    }

    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Borrow the bitplane
    pub fn as_raw(&self) -> &[u8] {
        &self.bitmap
    }

    /// Take the bitplane
    pub fn into_raw(self) -> Vec<u8> {
        self.bitmap
    }

    /// Expand the bitplane into grayscale pixels, 1 → 255 and 0 → 0
    pub fn to_grayscale(&self) -> Vec<u8> {
        to_grayscale(&self.bitmap)
    }

    /// Compare the one-byte-per-pixel size with the encoded size
    pub fn stats(&self) -> Result<CompressionStats, Error> {
        Ok(CompressionStats {
            raw_size: self.bitmap.len(),
            compressed_size: self.to_bytes()?.len(),
        })
    }
}

/// Open a `.bi` file written with the default compressor.
pub fn open<P: AsRef<Path>>(path: P) -> Result<BinaryPicture, Error> {
    let input = BufReader::new(File::open(path)?);
    BinaryPicture::decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x + y) % 2) as u8))
            .collect()
    }

    #[test]
    fn file_layout() {
        let picture = BinaryPicture::from_raw(3, 1, vec![1, 1, 1]).unwrap();
        let bytes = picture.to_bytes().unwrap();

        // header, then one flag byte covering two literal run stream bytes
        assert_eq!(bytes, vec![0, 0, 0, 3, 0, 0, 0, 1, 0, 1, 0x31]);
    }

    #[test]
    fn checkerboard_round_trip() {
        let bits = checkerboard(4, 4);
        let picture = BinaryPicture::from_raw(4, 4, bits.clone()).unwrap();

        let decoded = BinaryPicture::decode(&picture.to_bytes().unwrap()[..]).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
        assert_eq!(decoded.as_raw(), &bits[..]);
    }

    #[test]
    fn wrong_geometry() {
        let err = BinaryPicture::from_raw(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::GeometryMismatch { expected: 16, found: 15 }));
    }

    #[test]
    fn zero_geometry_is_empty() {
        let picture = BinaryPicture::from_raw(0, 7, Vec::new()).unwrap();
        let decoded = BinaryPicture::decode(&picture.to_bytes().unwrap()[..]).unwrap();
        assert_eq!(decoded.height(), 7);
        assert!(decoded.as_raw().is_empty());
    }

    #[test]
    fn header_only_decodes_to_zeros() {
        let bytes = ImageHeader { width: 2, height: 2 }.to_bytes();
        let decoded = BinaryPicture::decode(&bytes[..]).unwrap();
        assert_eq!(decoded.into_raw(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn truncated_header() {
        let err = BinaryPicture::decode(&[0u8, 0, 0][..]).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { expected: 8, found: 3 }));
    }

    #[test]
    fn huge_geometry_is_an_error() {
        let mut bytes = vec![0xFF; ImageHeader::LEN];
        bytes.extend([0, 1]);

        let err = BinaryPicture::decode(&bytes[..]).unwrap_err();
        assert!(matches!(
            err,
            Error::BitplaneTooLarge {
                width: u32::MAX,
                height: u32::MAX,
            }
        ));
    }

    #[test]
    fn deflate_backend() {
        let bits = checkerboard(32, 8);
        let picture = BinaryPicture::from_raw(32, 8, bits).unwrap();
        let backend = Backend::Deflate { level: 9 };

        let mut bytes = Vec::new();
        picture.encode_with(&mut bytes, &backend).unwrap();

        let decoded = BinaryPicture::decode_with(&bytes[..], &backend).unwrap();
        assert_eq!(decoded, picture);
    }

    #[test]
    fn grayscale_threshold() {
        let gray = [10, 200, 128, 129];
        let picture =
            BinaryPicture::from_grayscale(2, 2, &gray, Threshold::default()).unwrap();
        assert_eq!(picture.as_raw(), &[0, 1, 0, 1]);
        assert_eq!(picture.to_grayscale(), vec![0, 255, 0, 255]);
    }
}
