//! Error types for the pipeline.

use depthcal_capture::CaptureError;
use thiserror::Error;

/// Errors surfaced by `PipelineController`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Connection error: {0}")]
    Connection(#[from] CaptureError),

    /// The output mailbox is empty. Expected and frequent.
    #[error("No calibrated frame available")]
    NoData,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Failed to start calibration worker: {0}")]
    WorkerSpawn(std::io::Error),
}

impl PipelineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Per-frame failures. These never leave the worker thread.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Depth raster {depth:?} does not match color raster {color:?}")]
    RasterMismatch {
        depth: (u32, u32),
        color: (u32, u32),
    },

    #[error("Depth raster {raster:?} does not match camera model {model:?}")]
    ModelMismatch { raster: (u32, u32), model: (u32, u32) },

    #[error("Normal neighborhood must be at least 3 pixels, got {0}")]
    InvalidNeighborhood(usize),
}

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
