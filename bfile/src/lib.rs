//! BFile stores binarized (one bit per pixel) images and videos compactly.
//!
//! Pixels are first run-length coded, and the run stream is then squeezed
//! by a small windowed LZ77 compressor. Two containers wrap the result:
//!
//! - `.bi`, a single image: `[width:u32][height:u32][compressed block]`
//! - `.bv`, a video: `[width:u16][height:u16][fps:u32][frame count:u32]`
//!   followed by one `[length:u32][compressed block]` record per frame
//!
//! All integers are big-endian. The compressed data never records the
//! pixel count, so decoding always relies on the header geometry.
//!
//! # Example
//! ## Creating and writing a BI image
//! ```no_run
//! use bfile::BinaryPicture;
//!
//! // A 4×4 checkerboard, one value per pixel
//! let bitmap = vec![
//!     0, 1, 0, 1,
//!     1, 0, 1, 0,
//!     0, 1, 0, 1,
//!     1, 0, 1, 0,
//! ];
//!
//! let picture = BinaryPicture::from_raw(4, 4, bitmap).expect("Wrong geometry");
//! picture.save("checkers.bi").expect("Could not save the image");
//! ```
//!
//! ## Reading a BV video frame by frame
//! ```no_run
//! use std::fs::File;
//! use bfile::VideoReader;
//!
//! let input = File::open("clip.bv").expect("Could not open video file");
//! let mut reader = VideoReader::new(input).expect("Bad header");
//!
//! while let Some(frame) = reader.read_frame().expect("Corrupt frame") {
//!     println!("frame of {} pixels", frame.len());
//! }
//! ```

#[macro_use]
extern crate log;

mod binio;

pub mod compression;
pub mod error;
pub mod header;
pub mod operations;
pub mod picture;
pub mod runlength;
pub mod video;

// ----------------------- //
// INLINED USEFUL FEATURES //
// ----------------------- //
#[doc(inline)]
pub use picture::BinaryPicture;

#[doc(inline)]
pub use video::{BinaryVideo, FrameCache, FrameIndex, VideoReader};

#[doc(inline)]
pub use compression::{window::WindowOptions, Backend, CompressionStats};

#[doc(inline)]
pub use operations::{Threshold, ThresholdMode};

#[doc(inline)]
pub use error::Error;
