//! Depthcal Application
//!
//! Drives a calibration pipeline from a simulated device or from injected
//! synthetic frames and reports what came out the other end.

mod app;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// A simulated device producing frames on its own thread.
    Device,
    /// Frames submitted by this process.
    Injected,
}

/// Depthcal - RGB-D calibration pipeline driver
#[derive(Parser, Debug)]
#[command(name = "depthcal")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to produce
    #[arg(short, long, default_value_t = 30)]
    frames: u64,

    /// Raster width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Raster height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Depth of the synthetic wall, in millimetres
    #[arg(long, default_value_t = 1000)]
    depth_mm: u16,

    /// Frame source
    #[arg(short, long, value_enum, default_value = "injected")]
    source: SourceArg,

    /// Pause the pipeline for this many milliseconds halfway through
    #[arg(long)]
    paused_for: Option<u64>,

    /// Skip calibration and pass frames through
    #[arg(long)]
    pass_through: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = app::run(args) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
