mod utils;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context, Result};
use bfile::{
    operations::{sampling_stride, to_grayscale},
    BinaryPicture, BinaryVideo, CompressionStats, VideoReader,
};
use clap::{Args, Parser, Subcommand};
use image::{ExtendedColorType, GrayImage, ImageReader};
use log::{debug, info};
use utils::{exists_decision, list_frames, Assume, CodecArgs, ThresholdArgs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Subcommands,

    /// Overwrite output files
    #[arg(short = 'y', long = "overwrite", conflicts_with = "assumeno")]
    assumeyes: bool,

    /// Do not overwrite output files
    #[arg(short = 'n', long = "preserve", conflicts_with = "assumeyes")]
    assumeno: bool,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Binarize an image and store it as BI
    EncodeImage(EncodeImageArgs),

    /// Decode a BI image into another format
    DecodeImage(DecodeImageArgs),

    /// Binarize a directory of image frames and store them as BV
    EncodeVideo(EncodeVideoArgs),

    /// Decode a BV video into numbered PNG frames, optionally muxing them
    DecodeVideo(DecodeVideoArgs),

    /// Print the header and compression ratio of a BI or BV file
    Info(InfoArgs),
}

#[derive(Debug, Args)]
struct EncodeImageArgs {
    /// Input image file of any type supported by `image`
    input: PathBuf,
    /// Output path to BI location
    output: PathBuf,

    #[command(flatten)]
    threshold: ThresholdArgs,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(Debug, Args)]
struct DecodeImageArgs {
    /// Input BI image file
    input: PathBuf,
    /// Output image file
    output: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(Debug, Args)]
struct EncodeVideoArgs {
    /// Directory of frames, read in file name order
    input: PathBuf,
    /// Output path to BV location
    output: PathBuf,

    /// Frame rate of the source frames
    #[arg(long, default_value_t = 30.0)]
    source_fps: f64,

    /// Frame rate to store; source frames are sampled to match it
    #[arg(short, long, default_value_t = 10)]
    fps: u32,

    #[command(flatten)]
    threshold: ThresholdArgs,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(Debug, Args)]
struct DecodeVideoArgs {
    /// Input BV video file
    input: PathBuf,
    /// Directory receiving `frame_000000.png` and onwards
    output: PathBuf,

    /// Also mux the frames into this video file with ffmpeg
    #[arg(long)]
    mux: Option<PathBuf>,

    /// Frame rate of the muxed video (default: the stored rate)
    #[arg(short, long)]
    fps: Option<u32>,

    /// ffmpeg executable to call
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(Debug, Args)]
struct InfoArgs {
    /// BI or BV file, told apart by extension
    input: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Cli::parse();

    let assume = if args.assumeyes {
        Some(Assume::Yes)
    } else if args.assumeno {
        Some(Assume::No)
    } else {
        None
    };

    match args.command {
        Subcommands::EncodeImage(a) => encode_image(a, assume),
        Subcommands::DecodeImage(a) => decode_image(a, assume),
        Subcommands::EncodeVideo(a) => encode_video(a, assume),
        Subcommands::DecodeVideo(a) => decode_video(a, assume),
        Subcommands::Info(a) => info(a),
    }
}

/// Whether work should go ahead given the input and output paths
fn should_write(input: &Path, output: &Path, assume: Option<&Assume>) -> Result<bool> {
    if !input.try_exists()? {
        bail!("Input file {:?} does not exist", input);
    }

    if output.try_exists()? && !exists_decision("Output", "Overwrite", &output, assume) {
        return Ok(false)
    }

    Ok(true)
}

fn report(input: &Path, output: &Path, stats: CompressionStats) {
    info!("{input:?} -> {output:?}");
    println!(
        "{} pixel bytes -> {} bytes ({:.2}% saved)",
        stats.raw_size,
        stats.compressed_size,
        stats.ratio()
    );
}

fn encode_image(args: EncodeImageArgs, assume: Option<Assume>) -> Result<()> {
    if !should_write(&args.input, &args.output, assume.as_ref())? {
        return Ok(())
    }

    let image = ImageReader::open(&args.input)?
        .decode()?
        .into_luma8();

    let width = image.width();
    let height = image.height();

    let picture = BinaryPicture::from_grayscale(
        width,
        height,
        image.as_raw(),
        args.threshold.threshold(),
    )?;

    let mut out_file = BufWriter::new(File::create(&args.output)?);
    let written = picture.encode_with(&mut out_file, &args.codec.backend())?;
    out_file.flush()?;

    report(&args.input, &args.output, CompressionStats {
        raw_size: picture.as_raw().len(),
        compressed_size: written,
    });

    Ok(())
}

fn decode_image(args: DecodeImageArgs, assume: Option<Assume>) -> Result<()> {
    if !should_write(&args.input, &args.output, assume.as_ref())? {
        return Ok(())
    }

    let input = BufReader::new(File::open(&args.input)?);
    let picture = BinaryPicture::decode_with(input, &args.codec.backend())?;

    image::save_buffer(
        &args.output,
        &picture.to_grayscale(),
        picture.width(),
        picture.height(),
        ExtendedColorType::L8,
    )?;

    Ok(())
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let image = ImageReader::open(path)?
        .decode()
        .with_context(|| format!("Could not decode frame {path:?}"))?;

    Ok(image.into_luma8())
}

fn encode_video(args: EncodeVideoArgs, assume: Option<Assume>) -> Result<()> {
    if !should_write(&args.input, &args.output, assume.as_ref())? {
        return Ok(())
    }

    let frames = list_frames(&args.input)?;
    if frames.is_empty() {
        bail!("No image frames found in {:?}", args.input);
    }

    let stride = sampling_stride(args.source_fps, args.fps);
    let threshold = args.threshold.threshold();
    debug!("sampling every {stride} of {} source frames", frames.len());

    let mut sampled = frames.iter().step_by(stride);
    let Some(first) = sampled.next() else {
        bail!("No frames were sampled");
    };

    let image = load_gray(first)?;
    let mut video = BinaryVideo::new(image.width(), image.height(), args.fps)?;
    video.push_grayscale(image.as_raw(), threshold)?;

    for path in sampled {
        let image = load_gray(path)?;
        if (image.width(), image.height()) != (video.width() as u32, video.height() as u32) {
            bail!(
                "Frame {:?} is {}×{}, expected {}×{}",
                path,
                image.width(),
                image.height(),
                video.width(),
                video.height()
            );
        }

        video.push_grayscale(image.as_raw(), threshold)?;
    }

    let mut out_file = BufWriter::new(File::create(&args.output)?);
    let written = video.encode_with(&mut out_file, &args.codec.backend())?;
    out_file.flush()?;

    println!("Processed frames: {}/{}", video.frame_count(), frames.len());
    report(&args.input, &args.output, CompressionStats {
        raw_size: video.frame_count() * video.width() as usize * video.height() as usize,
        compressed_size: written,
    });

    Ok(())
}

fn decode_video(args: DecodeVideoArgs, assume: Option<Assume>) -> Result<()> {
    if !args.input.try_exists()? {
        bail!("Input file {:?} does not exist", args.input);
    }

    if let Some(mux) = &args.mux {
        if mux.try_exists()? && !exists_decision("Output", "Overwrite", mux, assume.as_ref()) {
            return Ok(())
        }
    }

    std::fs::create_dir_all(&args.output)?;

    let input = BufReader::new(File::open(&args.input)?);
    let mut reader = VideoReader::with_backend(input, args.codec.backend())?;
    let header = reader.header();

    let mut written = 0;
    while let Some(frame) = reader.read_frame()? {
        let frame_path = args.output.join(format!("frame_{written:06}.png"));
        image::save_buffer(
            &frame_path,
            &to_grayscale(&frame),
            header.width as u32,
            header.height as u32,
            ExtendedColorType::L8,
        )?;
        written += 1;
    }
    info!("wrote {written} frames to {:?}", args.output);

    let Some(mux) = args.mux else {
        return Ok(())
    };

    let fps = args.fps.unwrap_or(header.frame_rate).max(1);
    let status = Command::new(&args.ffmpeg)
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg(args.output.join("frame_%06d.png"))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-y"])
        .arg(&mux)
        .status()
        .with_context(|| format!("Could not run {:?}", args.ffmpeg))?;

    if !status.success() {
        bail!("ffmpeg exited with {status}");
    }

    Ok(())
}

fn info(args: InfoArgs) -> Result<()> {
    let is_video = args
        .input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bv"));

    let size = std::fs::metadata(&args.input)?.len() as usize;
    let input = BufReader::new(File::open(&args.input)?);
    let backend = args.codec.backend();

    if is_video {
        let video = BinaryVideo::decode_with(input, &backend)?;
        println!(
            "BV {}×{} @ {} fps, {} frames",
            video.width(),
            video.height(),
            video.frame_rate(),
            video.frame_count()
        );
        report(&args.input, &args.input, CompressionStats {
            raw_size: video.frame_count() * video.width() as usize * video.height() as usize,
            compressed_size: size,
        });
    } else {
        let picture = BinaryPicture::decode_with(input, &backend)?;
        println!("BI {}×{}", picture.width(), picture.height());
        report(&args.input, &args.input, CompressionStats {
            raw_size: picture.as_raw().len(),
            compressed_size: size,
        });
    }

    Ok(())
}
