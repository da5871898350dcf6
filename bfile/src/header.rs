use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{self, Read, Write};

use crate::error::Error;

/// Fill `buf` from `input`, stopping early only at end of input.
///
/// Returns how many bytes were read.
pub(crate) fn read_up_to<T: Read>(input: &mut T, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_header_bytes<T: Read, const N: usize>(input: &mut T) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    let found = read_up_to(input, &mut buf)?;
    if found < N {
        return Err(Error::MalformedHeader { expected: N, found });
    }
    Ok(buf)
}

/// Header of a single image (`.bi`) file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageHeader {
    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,
}

impl ImageHeader {
    pub const LEN: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[..4].copy_from_slice(&self.width.to_be_bytes());
        buf[4..].copy_from_slice(&self.height.to_be_bytes());
        buf
    }

    pub fn write_into<T: Write>(&self, output: &mut T) -> Result<usize, io::Error> {
        output.write_u32::<BE>(self.width)?;
        output.write_u32::<BE>(self.height)?;
        Ok(Self::LEN)
    }

    pub fn read_from<T: Read>(input: &mut T) -> Result<Self, Error> {
        let buf: [u8; Self::LEN] = read_header_bytes(input)?;
        let mut buf = &buf[..];

        Ok(ImageHeader {
            width: buf.read_u32::<BE>()?,
            height: buf.read_u32::<BE>()?,
        })
    }

    /// Number of pixels, which is the bit count of the decoded bitplane
    pub fn total_bits(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Header of a multi-frame (`.bv`) file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoHeader {
    /// Width of each frame in pixels.
    pub width: u16,

    /// Height of each frame in pixels.
    pub height: u16,

    /// Playback rate in frames per second.
    pub frame_rate: u32,

    /// Number of frame records following the header.
    pub frame_count: u32,
}

impl VideoHeader {
    pub const LEN: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[..2].copy_from_slice(&self.width.to_be_bytes());
        buf[2..4].copy_from_slice(&self.height.to_be_bytes());
        buf[4..8].copy_from_slice(&self.frame_rate.to_be_bytes());
        buf[8..].copy_from_slice(&self.frame_count.to_be_bytes());
        buf
    }

    pub fn write_into<T: Write>(&self, output: &mut T) -> Result<usize, io::Error> {
        output.write_u16::<BE>(self.width)?;
        output.write_u16::<BE>(self.height)?;
        output.write_u32::<BE>(self.frame_rate)?;
        output.write_u32::<BE>(self.frame_count)?;
        Ok(Self::LEN)
    }

    pub fn read_from<T: Read>(input: &mut T) -> Result<Self, Error> {
        let buf: [u8; Self::LEN] = read_header_bytes(input)?;
        let mut buf = &buf[..];

        Ok(VideoHeader {
            width: buf.read_u16::<BE>()?,
            height: buf.read_u16::<BE>()?,
            frame_rate: buf.read_u32::<BE>()?,
            frame_count: buf.read_u32::<BE>()?,
        })
    }

    /// Number of pixels in one frame
    pub fn total_bits(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_header_layout() {
        let header = ImageHeader { width: 0x0102_0304, height: 16 };
        assert_eq!(header.to_bytes(), [1, 2, 3, 4, 0, 0, 0, 16]);

        let mut written = Vec::new();
        assert_eq!(header.write_into(&mut written).unwrap(), ImageHeader::LEN);
        assert_eq!(written, header.to_bytes());

        let read = ImageHeader::read_from(&mut &written[..]).unwrap();
        assert_eq!(read, header);
    }

    #[test]
    fn video_header_layout() {
        let header = VideoHeader {
            width: 128,
            height: 64,
            frame_rate: 10,
            frame_count: 300,
        };
        assert_eq!(
            header.to_bytes(),
            [0, 128, 0, 64, 0, 0, 0, 10, 0, 0, 1, 44]
        );

        let read = VideoHeader::read_from(&mut &header.to_bytes()[..]).unwrap();
        assert_eq!(read, header);
        assert_eq!(read.total_bits(), 128 * 64);
    }

    #[test]
    fn short_header_is_malformed() {
        let err = ImageHeader::read_from(&mut &[0u8, 0, 0, 4, 0][..]).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { expected: 8, found: 5 }));

        let err = VideoHeader::read_from(&mut &[0u8; 0][..]).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { expected: 12, found: 0 }));
    }
}
