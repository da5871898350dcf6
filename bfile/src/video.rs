//! The multi-frame (`.bv`) container.
//!
//! A 12 byte [`VideoHeader`] is followed by `frame_count` records, each a
//! big-endian `u32` payload length and that many bytes of compressed frame.
//! Frames are compressed independently of each other.

use std::{
    collections::{HashMap, VecDeque},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

use byteorder::{WriteBytesExt, BE};
use rayon::prelude::*;

use crate::{
    compression::{Backend, CompressionStats},
    error::Error,
    header::{read_up_to, VideoHeader},
    operations::{binarize, Threshold},
    runlength,
};

const LENGTH_FIELD: usize = 4;

fn encode_frame(bits: &[u8], backend: &Backend) -> Result<Vec<u8>, Error> {
    Ok(backend.compress(&runlength::encode(bits))?)
}

fn decode_frame(block: &[u8], header: &VideoHeader, backend: &Backend) -> Result<Vec<u8>, Error> {
    let runs = backend.decompress(block)?;
    runlength::try_decode(&runs, header.total_bits()).map_err(|_| Error::BitplaneTooLarge {
        width: header.width as u32,
        height: header.height as u32,
    })
}

/// A sequence of equally sized bitplanes with a playback rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryVideo {
    header: VideoHeader,
    frames: Vec<Vec<u8>>,
}

impl BinaryVideo {
    /// Create an empty video. Frame dimensions must fit in 16 bits.
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Result<Self, Error> {
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(Error::DimensionsTooLarge { width, height });
        };

        Ok(Self {
            header: VideoHeader {
                width: w,
                height: h,
                frame_rate,
                frame_count: 0,
            },
            frames: Vec::new(),
        })
    }

    /// Create a video from already binarized frames
    pub fn from_frames(
        width: u32,
        height: u32,
        frame_rate: u32,
        frames: Vec<Vec<u8>>,
    ) -> Result<Self, Error> {
        let mut video = Self::new(width, height, frame_rate)?;
        for frame in frames {
            video.push_frame(frame)?;
        }
        Ok(video)
    }

    /// Append a bitplane of `width × height` values.
    pub fn push_frame(&mut self, bitmap: Vec<u8>) -> Result<(), Error> {
        if bitmap.len() != self.header.total_bits() {
            return Err(Error::GeometryMismatch {
                expected: self.header.total_bits(),
                found: bitmap.len(),
            });
        }

        self.frames.push(bitmap);
        self.header.frame_count = self.frames.len() as u32;
        Ok(())
    }

    /// Threshold a grayscale frame and append it.
    pub fn push_grayscale(&mut self, gray: &[u8], threshold: Threshold) -> Result<(), Error> {
        self.push_frame(binarize(gray, threshold))
    }

    /// Encode the video into anything that implements [Write], using the
    /// default window compressor.
    pub fn encode<O: Write>(&self, output: O) -> Result<usize, Error> {
        self.encode_with(output, &Backend::default())
    }

    /// Encode the video with a specific compression backend.
    ///
    /// Frames are compressed in parallel and written in order. Returns the
    /// number of bytes written.
    pub fn encode_with<O: Write>(&self, mut output: O, backend: &Backend) -> Result<usize, Error> {
        let blocks = self
            .frames
            .par_iter()
            .map(|frame| encode_frame(frame, backend))
            .collect::<Result<Vec<_>, _>>()?;

        let header = VideoHeader {
            frame_count: u32::try_from(blocks.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many frames"))?,
            ..self.header
        };

        let mut count = header.write_into(&mut output)?;
        for (i, block) in blocks.iter().enumerate() {
            let length = u32::try_from(block.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame payload too large"))?;

            output.write_u32::<BE>(length)?;
            output.write_all(block)?;
            count += LENGTH_FIELD + block.len();

            trace!("frame {i}: {} compressed bytes", block.len());
        }

        debug!(
            "encoded {} frames of {}×{} into {count} bytes",
            blocks.len(),
            header.width,
            header.height
        );

        Ok(count)
    }

    /// Decode a whole video using the default window compressor.
    pub fn decode<I: Read>(input: I) -> Result<Self, Error> {
        Self::decode_with(input, &Backend::default())
    }

    /// Decode a whole video written with a specific backend.
    ///
    /// The frame boundaries are located first, then all frames are
    /// decompressed in parallel.
    pub fn decode_with<I: Read>(mut input: I, backend: &Backend) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let index = FrameIndex::scan(&bytes)?;
        let frames = index.decode_all(&bytes, backend)?;

        Ok(Self {
            header: index.header,
            frames,
        })
    }

    /// Encode the video into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        self.encode(&mut output)?;
        Ok(output)
    }

    /// Save the video to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out_file = BufWriter::new(File::create(path.as_ref())?);
        self.encode(&mut out_file)?;
        out_file.flush()?;

        Ok(())
    }

    pub fn header(&self) -> VideoHeader {
        self.header
    }

    pub fn width(&self) -> u16 {
        self.header.width
    }

    pub fn height(&self) -> u16 {
        self.header.height
    }

    pub fn frame_rate(&self) -> u32 {
        self.header.frame_rate
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Vec<u8>> {
        self.frames
    }

    /// Compare the one-byte-per-pixel size with the encoded size
    pub fn stats(&self) -> Result<CompressionStats, Error> {
        Ok(CompressionStats {
            raw_size: self.frames.len() * self.header.total_bits(),
            compressed_size: self.to_bytes()?.len(),
        })
    }
}

/// Open a `.bv` file written with the default compressor.
pub fn open<P: AsRef<Path>>(path: P) -> Result<BinaryVideo, Error> {
    let input = BufReader::new(File::open(path)?);
    BinaryVideo::decode(input)
}

/// Reads the frames of a video one after another from a stream.
///
/// The format has no per-frame offsets, so frames come out in order. For
/// random access over a seekable stream see [`VideoReader::seek_frame`].
pub struct VideoReader<R> {
    input: R,
    header: VideoHeader,
    backend: Backend,

    next_frame: u32,
    failed: bool,
}

impl<R: Read> VideoReader<R> {
    /// Read the header and position the reader at the first frame
    pub fn new(input: R) -> Result<Self, Error> {
        Self::with_backend(input, Backend::default())
    }

    pub fn with_backend(mut input: R, backend: Backend) -> Result<Self, Error> {
        let header = VideoHeader::read_from(&mut input)?;

        Ok(Self {
            input,
            header,
            backend,

            next_frame: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> VideoHeader {
        self.header
    }

    /// Index of the frame the next read returns
    pub fn frame_index(&self) -> u32 {
        self.next_frame
    }

    /// Read the next compressed frame record without decompressing it.
    ///
    /// Returns `Ok(None)` once `frame_count` records were read or after a
    /// previous failure.
    pub fn read_block(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if self.failed || self.next_frame >= self.header.frame_count {
            return Ok(None);
        }

        match self.read_record() {
            Ok(block) => {
                self.next_frame += 1;
                Ok(Some(block))
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    fn read_record(&mut self) -> Result<Vec<u8>, Error> {
        let frame = self.next_frame;

        let mut length = [0u8; LENGTH_FIELD];
        if read_up_to(&mut self.input, &mut length)? < LENGTH_FIELD {
            return Err(Error::TruncatedLength { frame });
        }
        let declared = u32::from_be_bytes(length) as usize;

        let mut block = Vec::new();
        (&mut self.input)
            .take(declared as u64)
            .read_to_end(&mut block)?;

        if block.len() < declared {
            return Err(Error::TruncatedPayload {
                frame,
                declared,
                available: block.len(),
            });
        }

        Ok(block)
    }

    /// Read and decode the next frame.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let Some(block) = self.read_block()? else {
            return Ok(None);
        };

        decode_frame(&block, &self.header, &self.backend).map(Some)
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

impl<R: Read + Seek> VideoReader<R> {
    /// Position the reader so the next read returns frame `index`.
    ///
    /// The index must come from the same stream.
    pub fn seek_frame(&mut self, index: &FrameIndex, frame: usize) -> Result<(), Error> {
        let Some(entry) = index.entry(frame) else {
            return Err(Error::FrameOutOfRange {
                index: frame,
                count: index.len(),
            });
        };

        self.input
            .seek(SeekFrom::Start((entry.offset - LENGTH_FIELD) as u64))?;
        self.next_frame = frame as u32;
        self.failed = false;

        Ok(())
    }
}

impl<R: Read> Iterator for VideoReader<R> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Location of one compressed frame inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Offset of the payload, just past its length field
    pub offset: usize,

    /// Payload length in bytes
    pub length: usize,
}

/// Byte ranges of every frame payload in an in-memory container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIndex {
    header: VideoHeader,
    entries: Vec<FrameEntry>,
}

impl FrameIndex {
    /// Walk the length prefixes of a container once.
    pub fn scan(bytes: &[u8]) -> Result<Self, Error> {
        let header = VideoHeader::read_from(&mut &bytes[..])?;

        let mut entries = Vec::new();
        let mut position = VideoHeader::LEN;
        for frame in 0..header.frame_count {
            let Some(length) = bytes.get(position..position + LENGTH_FIELD) else {
                return Err(Error::TruncatedLength { frame });
            };
            let length = u32::from_be_bytes([length[0], length[1], length[2], length[3]]) as usize;
            position += LENGTH_FIELD;

            let available = bytes.len() - position;
            if length > available {
                return Err(Error::TruncatedPayload {
                    frame,
                    declared: length,
                    available,
                });
            }

            entries.push(FrameEntry {
                offset: position,
                length,
            });
            position += length;
        }

        if position < bytes.len() {
            debug!("ignoring {} bytes after the last frame", bytes.len() - position);
        }

        Ok(Self { header, entries })
    }

    pub fn header(&self) -> VideoHeader {
        self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, frame: usize) -> Option<FrameEntry> {
        self.entries.get(frame).copied()
    }

    /// The compressed payload of one frame
    pub fn block<'a>(&self, bytes: &'a [u8], frame: usize) -> Option<&'a [u8]> {
        let entry = self.entry(frame)?;
        bytes.get(entry.offset..entry.offset + entry.length)
    }

    /// Decode a single frame out of order.
    pub fn decode_frame(&self, bytes: &[u8], frame: usize, backend: &Backend) -> Result<Vec<u8>, Error> {
        let Some(block) = self.block(bytes, frame) else {
            return Err(Error::FrameOutOfRange {
                index: frame,
                count: self.len(),
            });
        };

        decode_frame(block, &self.header, backend)
    }

    /// Decode every frame in parallel.
    pub fn decode_all(&self, bytes: &[u8], backend: &Backend) -> Result<Vec<Vec<u8>>, Error> {
        (0..self.len())
            .into_par_iter()
            .map(|frame| self.decode_frame(bytes, frame, backend))
            .collect()
    }
}

/// Decoded frames kept by index, evicting the oldest insertion once full.
#[derive(Debug, Clone)]
pub struct FrameCache {
    capacity: usize,
    order: VecDeque<usize>,
    frames: HashMap<usize, Vec<u8>>,
}

impl FrameCache {
    /// A cache holding at most `capacity` frames. A capacity of zero
    /// caches nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            frames: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn get(&self, frame: usize) -> Option<&[u8]> {
        self.frames.get(&frame).map(Vec::as_slice)
    }

    /// Store a frame. Replacing an existing frame keeps its original
    /// insertion position.
    pub fn insert(&mut self, frame: usize, bitmap: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }

        if let Some(existing) = self.frames.get_mut(&frame) {
            *existing = bitmap;
            return;
        }

        while self.frames.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.frames.remove(&oldest);
            trace!("evicted frame {oldest} from cache");
        }

        self.order.push_back(frame);
        self.frames.insert(frame, bitmap);
    }

    /// Return a cached frame, decoding and caching it first if missing.
    pub fn get_or_decode(
        &mut self,
        index: &FrameIndex,
        bytes: &[u8],
        frame: usize,
        backend: &Backend,
    ) -> Result<Vec<u8>, Error> {
        if let Some(bitmap) = self.frames.get(&frame) {
            return Ok(bitmap.clone());
        }

        let bitmap = index.decode_frame(bytes, frame, backend)?;
        self.insert(frame, bitmap.clone());
        Ok(bitmap)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.frames.clear();
    }
}
