//! The caller-facing pipeline orchestrator.
//!
//! `PipelineController` owns the frame source, the calibration worker and
//! the two mailboxes between them. It is the only type applications need to
//! touch:
//!
//! ```ignore
//! let controller = PipelineController::new(PipelineConfig::default());
//! controller.set_camera_models(rgb.clone(), depth.clone())?;
//! controller.submit_frame(depth_samples, rgb_bytes, 1)?;
//! if let Some(frame) = controller.try_fetch_frame() {
//!     // use frame.points
//! }
//! ```
//!
//! State transitions:
//!
//! | from | call | to |
//! |---|---|---|
//! | Disconnected | `connect_device` | Paused |
//! | Disconnected | `submit_frame` | Streaming |
//! | Paused / Streaming | `set_pause` | Paused / Streaming |
//! | any | `disconnect_device` | Disconnected |

use std::sync::Arc;

use depthcal_capture::{CaptureError, FrameCallback, FrameSource, InjectedSource};
use depthcal_data::{CalibratedFrame, CameraModel, DepthImage, Dimensions, RawFrame, SourceKind};
use image::RgbImage;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::corrector::Corrector;
use crate::error::PipelineError;
use crate::stats::StatsSnapshot;
use crate::worker::{CalibrationWorker, SharedState};

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Disconnected = 0,
    Paused = 1,
    Streaming = 2,
}

impl PipelineState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Paused,
            2 => Self::Streaming,
            _ => Self::Disconnected,
        }
    }
}

/// Opens device sources for `connect_device`.
///
/// Hardware backends plug in here; the returned source is connected by the
/// controller.
pub trait DeviceFactory: Send + Sync {
    fn open(&self) -> Box<dyn FrameSource>;
}

impl<F> DeviceFactory for F
where
    F: Fn() -> Box<dyn FrameSource> + Send + Sync,
{
    fn open(&self) -> Box<dyn FrameSource> {
        self()
    }
}

#[derive(Clone)]
struct CameraModels {
    rgb: Arc<CameraModel>,
    depth: Arc<CameraModel>,
}

enum ActiveSource {
    Device(Box<dyn FrameSource>),
    Injected(InjectedSource),
}

impl ActiveSource {
    fn as_source(&self) -> &dyn FrameSource {
        match self {
            Self::Device(source) => source.as_ref(),
            Self::Injected(source) => source,
        }
    }

    fn as_source_mut(&mut self) -> &mut dyn FrameSource {
        match self {
            Self::Device(source) => source.as_mut(),
            Self::Injected(source) => source,
        }
    }
}

struct Session {
    source: ActiveSource,
    worker: CalibrationWorker,
    models: CameraModels,
}

#[derive(Default)]
struct Inner {
    models: Option<CameraModels>,
    session: Option<Session>,
}

/// Public orchestrator for one RGB-D pipeline.
///
/// Every method takes `&self`, so a controller can be shared between a
/// producing thread and a consuming thread. `submit_frame` and `fetch_frame`
/// must each be called from at most one thread at a time.
pub struct PipelineController {
    config: PipelineConfig,
    factory: Option<Box<dyn DeviceFactory>>,
    shared: Arc<SharedState>,
    inner: Mutex<Inner>,
}

impl PipelineController {
    /// A controller that only accepts injected frames.
    pub fn new(config: PipelineConfig) -> Self {
        let shared = Arc::new(SharedState::new(config.worker.calibration_enabled));
        Self {
            config,
            factory: None,
            shared,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Use `factory` to open device sources on `connect_device`.
    pub fn with_device_factory(mut self, factory: impl DeviceFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() != PipelineState::Disconnected
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Attach the camera models used for calibration.
    ///
    /// The controller keeps the shared handles, not copies. Models must be
    /// attached while disconnected, and both must describe the same raster
    /// since color and depth are registered pixel for pixel.
    pub fn set_camera_models(
        &self,
        rgb: Arc<CameraModel>,
        depth: Arc<CameraModel>,
    ) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Err(PipelineError::config(
                "camera models must be set before connecting",
            ));
        }
        if rgb.dimensions() != depth.dimensions() {
            return Err(PipelineError::config(format!(
                "rgb model {:?} and depth model {:?} must share one raster",
                rgb.dimensions(),
                depth.dimensions()
            )));
        }
        debug!(rgb = ?rgb.dimensions(), depth = ?depth.dimensions(), "Camera models attached");
        inner.models = Some(CameraModels { rgb, depth });
        Ok(())
    }

    /// Open device `device_index` and start the worker. The pipeline starts
    /// paused.
    ///
    /// Without attached camera models the device's own intrinsics are used.
    pub fn connect_device(&self, device_index: u32) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Err(PipelineError::AlreadyConnected);
        }

        let factory = self.factory.as_ref().ok_or_else(|| {
            PipelineError::Connection(CaptureError::DeviceNotFound(format!(
                "no device backend for index {device_index}"
            )))
        })?;

        let mut source = factory.open();
        source.on_frame(self.input_callback());
        if let Err(e) = source.connect(device_index) {
            warn!(device_index, error = %e, "Failed to connect device");
            return Err(e.into());
        }
        source.set_paused(true);

        let models = match inner.models.clone() {
            Some(models) => models,
            None => match source.intrinsics() {
                Some(model) => {
                    info!(?model, "Using device-reported intrinsics");
                    let model = Arc::new(model);
                    CameraModels {
                        rgb: Arc::clone(&model),
                        depth: model,
                    }
                }
                None => {
                    source.disconnect();
                    return Err(PipelineError::config(
                        "camera models are not set and the device reports none",
                    ));
                }
            },
        };

        self.shared.set_state(PipelineState::Paused);
        let worker = match self.start_worker(&models) {
            Ok(worker) => worker,
            Err(e) => {
                source.disconnect();
                self.shared.set_state(PipelineState::Disconnected);
                return Err(e);
            }
        };

        inner.session = Some(Session {
            source: ActiveSource::Device(source),
            worker,
            models,
        });
        info!(device_index, "Device connected (paused)");
        Ok(())
    }

    /// Stop the worker, release the source and discard pending frames.
    /// Idempotent.
    pub fn disconnect_device(&self) {
        let mut inner = self.inner.lock();
        let Some(mut session) = inner.session.take() else {
            return;
        };

        self.shared.set_state(PipelineState::Disconnected);
        session.worker.stop();
        session.source.as_source_mut().disconnect();
        self.shared.input.clear();
        self.shared.output.clear();
        info!("Pipeline disconnected");
    }

    /// Pause or resume frame intake.
    ///
    /// Pausing discards the pending input frame but keeps the last calibrated
    /// frame available for `fetch_frame`.
    pub fn set_pause(&self, paused: bool) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock();
        let session = inner
            .session
            .as_mut()
            .ok_or_else(|| PipelineError::config("not connected"))?;

        session.source.as_source_mut().set_paused(paused);
        if paused {
            self.shared.set_state(PipelineState::Paused);
            self.shared.input.clear();
        } else {
            self.shared.set_state(PipelineState::Streaming);
        }
        info!(paused, "Pause state changed");
        Ok(())
    }

    /// Choose between full calibration and pass-through.
    ///
    /// Pass-through frames keep advancing indices but carry empty clouds.
    pub fn set_calibration_enabled(&self, enabled: bool) {
        self.shared.set_calibration_enabled(enabled);
        info!(enabled, "Calibration toggled");
    }

    pub fn calibration_enabled(&self) -> bool {
        self.shared.calibration_enabled()
    }

    /// Submit plain buffers sized by the attached camera models.
    ///
    /// `depth` holds `width × height` samples of the depth model, `color`
    /// three bytes per pixel of the rgb model. The first submission on a
    /// disconnected controller attaches an injected source and starts
    /// streaming. Indices should be non-decreasing; out-of-order indices are
    /// accepted and show up out of order on the consumer side.
    pub fn submit_frame(
        &self,
        depth: Vec<u16>,
        color: Vec<u8>,
        index: u64,
    ) -> Result<(), PipelineError> {
        let models = self.submission_models()?;
        let (dw, dh) = models.depth.dimensions();
        let (cw, ch) = models.rgb.dimensions();

        let depth_len = depth.len();
        let depth = DepthImage::from_raw(dw, dh, depth)
            .filter(|_| depth_len == dw as usize * dh as usize)
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "depth buffer holds {depth_len} samples, expected {dw}x{dh}"
                ))
            })?;
        let color_len = color.len();
        let color = RgbImage::from_raw(cw, ch, color)
            .filter(|_| color_len == cw as usize * ch as usize * 3)
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "color buffer holds {color_len} bytes, expected {cw}x{ch}x3"
                ))
            })?;

        self.submit_raw_frame(RawFrame::new(depth, color, index, SourceKind::Injected))
    }

    /// Submit a prepared frame (which may be flagged as mirrored).
    pub fn submit_raw_frame(&self, frame: RawFrame) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock();

        if matches!(
            inner.session,
            Some(Session {
                source: ActiveSource::Device(_),
                ..
            })
        ) {
            return Err(PipelineError::config(
                "a device source is active; injected frames are not accepted",
            ));
        }

        let models = match inner.session.as_ref() {
            Some(session) => session.models.clone(),
            None => inner.models.clone().ok_or_else(|| {
                PipelineError::config("camera models must be set before submitting frames")
            })?,
        };
        check_frame(&frame, &models)?;

        if inner.session.is_none() {
            inner.session = Some(self.attach_injected(models)?);
        }

        let Some(Session {
            source: ActiveSource::Injected(source),
            ..
        }) = inner.session.as_mut()
        else {
            return Err(PipelineError::config("injected source unavailable"));
        };

        if !source.submit(frame) {
            self.shared.stats.record_skipped_paused();
        }
        Ok(())
    }

    /// Whether a calibrated frame is waiting.
    pub fn is_frame_ready(&self) -> bool {
        self.shared.output.peek()
    }

    /// Take the freshest calibrated frame.
    pub fn fetch_frame(&self) -> Result<CalibratedFrame, PipelineError> {
        let frame = self.shared.output.take().ok_or(PipelineError::NoData)?;
        self.shared.stats.record_fetched();
        Ok(frame)
    }

    /// `fetch_frame` with the expected empty case as `None`.
    pub fn try_fetch_frame(&self) -> Option<CalibratedFrame> {
        self.fetch_frame().ok()
    }

    /// Intrinsics of the active source.
    pub fn intrinsics(&self) -> Result<CameraModel, PipelineError> {
        let inner = self.inner.lock();
        let session = inner
            .session
            .as_ref()
            .ok_or_else(|| PipelineError::config("not connected"))?;
        Ok(session
            .source
            .as_source()
            .intrinsics()
            .unwrap_or(*session.models.rgb))
    }

    /// Stream dimensions of the active source.
    pub fn dimensions(&self) -> Result<Dimensions, PipelineError> {
        let inner = self.inner.lock();
        let session = inner
            .session
            .as_ref()
            .ok_or_else(|| PipelineError::config("not connected"))?;
        Ok(session
            .source
            .as_source()
            .dimensions()
            .unwrap_or_else(|| Dimensions::from_models(&session.models.rgb, &session.models.depth)))
    }

    fn submission_models(&self) -> Result<CameraModels, PipelineError> {
        let inner = self.inner.lock();
        match inner.session.as_ref() {
            Some(session) => Ok(session.models.clone()),
            None => inner.models.clone().ok_or_else(|| {
                PipelineError::config("camera models must be set before submitting frames")
            }),
        }
    }

    /// The callback every source feeds: drop while paused, else put.
    fn input_callback(&self) -> FrameCallback {
        let shared = Arc::clone(&self.shared);
        let mirror_device = self.config.mirror_device_data;
        Arc::new(move |mut frame: RawFrame| {
            if shared.state() != PipelineState::Streaming {
                shared.stats.record_skipped_paused();
                return;
            }
            if mirror_device && frame.source == SourceKind::Device {
                frame.mirrored = true;
            }
            let displaced = shared.input.put(frame);
            shared.stats.record_received(displaced.is_some());
        })
    }

    fn attach_injected(&self, models: CameraModels) -> Result<Session, PipelineError> {
        let mut source = InjectedSource::new(Arc::clone(&models.rgb), Arc::clone(&models.depth));
        source.on_frame(self.input_callback());
        source.connect(0)?;

        self.shared.set_state(PipelineState::Streaming);
        let worker = match self.start_worker(&models) {
            Ok(worker) => worker,
            Err(e) => {
                source.disconnect();
                self.shared.set_state(PipelineState::Disconnected);
                return Err(e);
            }
        };

        info!("Injected source attached (streaming)");
        Ok(Session {
            source: ActiveSource::Injected(source),
            worker,
            models,
        })
    }

    fn start_worker(&self, models: &CameraModels) -> Result<CalibrationWorker, PipelineError> {
        let corrector = Corrector::new(self.config.corrector.clone(), Arc::clone(&models.depth))
            .map_err(|e| PipelineError::config(e.to_string()))?;
        CalibrationWorker::start(
            Arc::clone(&self.shared),
            corrector,
            self.config.worker.idle_interval(),
        )
        .map_err(PipelineError::WorkerSpawn)
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.disconnect_device();
    }
}

fn check_frame(frame: &RawFrame, models: &CameraModels) -> Result<(), PipelineError> {
    let (dw, dh) = frame.depth_dimensions();
    if !models.depth.matches(dw, dh) {
        return Err(PipelineError::config(format!(
            "depth raster {dw}x{dh} does not match the depth model {:?}",
            models.depth.dimensions()
        )));
    }
    let (cw, ch) = frame.color_dimensions();
    if !models.rgb.matches(cw, ch) {
        return Err(PipelineError::config(format!(
            "color raster {cw}x{ch} does not match the rgb model {:?}",
            models.rgb.dimensions()
        )));
    }
    Ok(())
}
