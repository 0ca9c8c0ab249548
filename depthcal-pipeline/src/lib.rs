//! Depthcal Pipeline Crate
//!
//! Moves raw RGB-D frames from a producer to a consumer through a background
//! calibration worker. Frames cross threads only through two single-slot
//! mailboxes, so the producer never waits on calibration and the consumer
//! always reads the freshest finished frame.
//!
//! ## Modules
//!
//! - [`mailbox`]: single-slot, latest-wins exchange cell
//! - [`corrector`]: mirror correction, back-projection, normals, rigid transform
//! - [`worker`]: the calibration thread
//! - [`controller`]: the caller-facing orchestrator
//! - [`config`]: serde-backed configuration

pub mod config;
pub mod controller;
pub mod corrector;
pub mod error;
pub mod mailbox;
pub mod stats;
pub mod worker;

pub use config::{CorrectorConfig, LoggingConfig, PipelineConfig, WorkerConfig};
pub use controller::{DeviceFactory, PipelineController, PipelineState};
pub use corrector::Corrector;
pub use error::{ConfigError, FrameError, PipelineError};
pub use mailbox::Mailbox;
pub use stats::{PipelineStats, StatsSnapshot};
pub use worker::CalibrationWorker;
