// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use scanwerk_core::types::{PixelFormat, Rotation, Size};

#[derive(Debug, Parser)]
#[command(name = "scanwerk", version, about = "Find a document in a camera frame and flatten it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay an image as preview frames, capture, and write the crop.
    Scan(ScanArgs),
    /// Print the default configuration as JSON.
    Config {
        /// Also write it to the per-user config file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Image to replay as the preview stream.
    pub input: PathBuf,

    /// Where to write the rectified PNG.
    #[arg(short, long, default_value = "scan.png")]
    pub output: PathBuf,

    /// Higher-resolution image to rectify instead of the preview frame.
    #[arg(long)]
    pub still: Option<PathBuf>,

    /// Also write the last detection overlay as PNG.
    #[arg(long)]
    pub overlay_out: Option<PathBuf>,

    /// JSON configuration file (defaults to the per-user config, if any).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pixel format the preview frames are delivered in.
    #[arg(long, value_enum, default_value_t = FrameFormat::Nv21)]
    pub format: FrameFormat,

    /// Clockwise sensor mounting offset in degrees.
    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    pub sensor_offset: Rotation,

    /// Device display rotation in degrees.
    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    pub device_rotation: Rotation,

    /// Preview surface as WIDTHxHEIGHT (defaults to the upright input size).
    #[arg(long, value_parser = parse_size)]
    pub surface: Option<Size>,

    /// Number of preview ticks before capturing.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub ticks: u32,

    /// Binarize the crop for text.
    #[arg(long)]
    pub document: bool,

    /// Draw every traced contour in the overlay.
    #[arg(long)]
    pub debug_overlay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrameFormat {
    Gray8,
    Nv21,
    Rgb24,
}

impl From<FrameFormat> for PixelFormat {
    fn from(format: FrameFormat) -> Self {
        match format {
            FrameFormat::Gray8 => PixelFormat::Gray8,
            FrameFormat::Nv21 => PixelFormat::Nv21,
            FrameFormat::Rgb24 => PixelFormat::Rgb24,
        }
    }
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees: i32 = value.parse().map_err(|e| format!("{value}: {e}"))?;
    Rotation::from_degrees(degrees).map_err(|e| e.to_string())
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("width {w}: {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("height {h}: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("surface must not be empty: {value}"));
    }
    Ok(Size::new(width, height))
}
