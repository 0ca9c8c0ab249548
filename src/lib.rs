//! Depthcal
//!
//! A double-buffered RGB-D calibration pipeline. Raw depth and color frames
//! go in on one thread, a background worker turns them into organized,
//! normal-annotated point clouds, and a consumer thread fetches the freshest
//! result without ever blocking on calibration.
//!
//! The pieces live in separate crates and are re-exported here:
//!
//! - [`data`]: camera models, frames and point types
//! - [`capture`]: device and injected frame sources
//! - [`pipeline`]: the controller, worker, mailboxes and corrector
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use depthcal::{CameraModel, PipelineConfig, PipelineController};
//!
//! let model = Arc::new(CameraModel::new(525.0, 525.0, 319.5, 239.5, 640, 480));
//! let controller = PipelineController::new(PipelineConfig::default());
//! controller.set_camera_models(model.clone(), model)?;
//! controller.submit_frame(vec![1000; 640 * 480], vec![0; 640 * 480 * 3], 1)?;
//! if let Some(frame) = controller.try_fetch_frame() {
//!     println!("{} valid points", frame.valid_count());
//! }
//! # Ok::<(), depthcal::PipelineError>(())
//! ```

pub use depthcal_capture as capture;
pub use depthcal_data as data;
pub use depthcal_pipeline as pipeline;

pub use glam;
pub use image;

pub use depthcal_capture::{CaptureError, FrameSource, InjectedSource, SimulatedDevice};
pub use depthcal_data::{
    CalibratedFrame, CameraModel, DepthImage, Dimensions, PointNormal, RawFrame, RigidTransform,
    SourceKind,
};
pub use depthcal_pipeline::{
    ConfigError, CorrectorConfig, DeviceFactory, FrameError, LoggingConfig, PipelineConfig,
    PipelineController, PipelineError, PipelineState, StatsSnapshot, WorkerConfig,
};
