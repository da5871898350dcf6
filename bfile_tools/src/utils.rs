use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use bfile::{Backend, Threshold, WindowOptions};
use clap::{Args, ValueEnum};
use text_io::read;

pub enum Assume {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Built in windowed LZ77
    Window,
    /// zlib deflate
    Deflate,
}

/// Options shared by every subcommand that compresses or decompresses
#[derive(Debug, Args)]
pub struct CodecArgs {
    /// Compression backend. Files must be read with the backend they were
    /// written with.
    #[arg(short, long, value_enum, default_value_t = BackendKind::Window)]
    pub backend: BackendKind,

    /// Deflate compression level
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Back-reference window of the LZ77 backend, in bytes
    #[arg(long, default_value_t = 8192)]
    pub window_size: usize,

    /// Shortest match the LZ77 backend encodes as a back-reference
    #[arg(long, default_value_t = 4)]
    pub min_match: usize,

    /// Limit on window positions searched per token (default: all)
    #[arg(long)]
    pub search_depth: Option<usize>,
}

impl CodecArgs {
    pub fn backend(&self) -> Backend {
        match self.backend {
            BackendKind::Window => Backend::Window(WindowOptions {
                window_size: self.window_size,
                min_match: self.min_match,
                max_search_depth: self.search_depth,
                ..Default::default()
            }),
            BackendKind::Deflate => Backend::Deflate { level: self.level },
        }
    }
}

/// Binarization options
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// Gray level separating black from white
    #[arg(short, long, default_value_t = 128)]
    pub threshold: u8,

    /// Count pixels equal to the threshold as white
    #[arg(long)]
    pub inclusive: bool,
}

impl ThresholdArgs {
    pub fn threshold(&self) -> Threshold {
        if self.inclusive {
            Threshold::inclusive(self.threshold)
        } else {
            Threshold::strict(self.threshold)
        }
    }
}

/// Image files in a directory, sorted by name
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Frame directory {:?} does not exist", dir);
    }

    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && image::ImageFormat::from_path(&path).is_ok() {
            frames.push(path);
        }
    }
    frames.sort();

    Ok(frames)
}

pub fn exists_decision<P: AsRef<Path>>(place: &str, action: &str, path: &P, assume: Option<&Assume>) -> bool {
    let path = path.as_ref();

    match assume {
        Some(Assume::Yes) => return true,
        Some(Assume::No) => return false,
        None => (),
    }

    loop {
        print!("{place} file {path:?} already exists. {action}? [y/N] ");
        let _ = std::io::stdout().flush();

        let opt: String = read!("{}\n");
        match opt.trim().to_lowercase().as_str() {
            "y" | "yes" => return true,
            "" | "n" | "no" => return false,
            _ => continue,
        }
    }
}
