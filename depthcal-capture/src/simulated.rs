//! A device source backed by a frame generator instead of hardware.
//!
//! Behaves like a driver session: frames arrive on a driver thread at a fixed
//! rate, delivery stops while paused, and opening an index past the
//! configured device count fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use depthcal_data::{CameraModel, DepthImage, Dimensions, RawFrame, SourceKind};
use image::{Rgb, RgbImage};
use tracing::{debug, info};

use crate::frame_loop::{LoopAction, LoopThread};
use crate::source::{CaptureError, FrameCallback, FrameSource};

/// Produces the frame with the given index.
pub type FrameGenerator = Arc<dyn Fn(u64) -> RawFrame + Send + Sync>;

/// Longest the driver thread sleeps while paused.
const PAUSED_POLL: Duration = Duration::from_millis(2);

/// A frame of constant depth and mid-gray color.
pub fn uniform_frame(width: u32, height: u32, depth: u16, index: u64) -> RawFrame {
    RawFrame::new(
        DepthImage::from_pixel(width, height, image::Luma([depth])),
        RgbImage::from_pixel(width, height, Rgb([128, 128, 128])),
        index,
        SourceKind::Injected,
    )
}

/// Simulated RGB-D device.
pub struct SimulatedDevice {
    model: CameraModel,
    generator: FrameGenerator,
    device_count: u32,
    frame_interval: Duration,
    frame_limit: Option<u64>,
    mirrored: bool,
    callback: Option<FrameCallback>,
    paused: Arc<AtomicBool>,
    driver: Option<LoopThread>,
}

impl SimulatedDevice {
    pub fn new(model: CameraModel, generator: FrameGenerator) -> Self {
        Self {
            model,
            generator,
            device_count: 1,
            frame_interval: Duration::from_millis(33),
            frame_limit: None,
            mirrored: false,
            callback: None,
            paused: Arc::new(AtomicBool::new(true)),
            driver: None,
        }
    }

    /// A device that always sees a flat wall at `depth`.
    pub fn uniform(model: CameraModel, depth: u16) -> Self {
        let (width, height) = model.dimensions();
        Self::new(
            model,
            Arc::new(move |index| uniform_frame(width, height, depth, index)),
        )
    }

    /// Number of device indices that can be opened.
    pub fn with_device_count(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Stop delivering after `limit` frames.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Mark delivered frames as horizontally mirrored.
    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }
}

impl FrameSource for SimulatedDevice {
    /// The callback must be registered before connecting.
    fn connect(&mut self, device_index: u32) -> Result<(), CaptureError> {
        if self.driver.is_some() {
            return Err(CaptureError::OpenFailed(format!(
                "simulated device {device_index} is already open"
            )));
        }
        if device_index >= self.device_count {
            return Err(CaptureError::DeviceNotFound(format!(
                "simulated device {device_index} (have {})",
                self.device_count
            )));
        }

        self.paused.store(true, Ordering::Release);

        let paused = Arc::clone(&self.paused);
        let generator = Arc::clone(&self.generator);
        let callback = self.callback.clone();
        let interval = self.frame_interval;
        let limit = self.frame_limit;
        let mirrored = self.mirrored;
        let mut next_index = 1u64;

        let driver = LoopThread::spawn(&format!("sim-device-{device_index}"), move || {
            if paused.load(Ordering::Acquire) {
                thread::sleep(interval.min(PAUSED_POLL));
                return LoopAction::Continue;
            }
            if limit.is_some_and(|limit| next_index > limit) {
                return LoopAction::Stop;
            }

            let mut frame = generator(next_index);
            frame.index = next_index;
            frame.source = SourceKind::Device;
            frame.mirrored = mirrored;
            if let Some(callback) = callback.as_ref() {
                callback(frame);
            }
            next_index += 1;

            thread::sleep(interval);
            LoopAction::Continue
        })?;

        info!(
            "Simulated device {} opened: {}x{}",
            device_index, self.model.width, self.model.height
        );
        self.driver = Some(driver);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
            debug!("Simulated device closed");
        }
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    fn on_frame(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    fn intrinsics(&self) -> Option<CameraModel> {
        Some(self.model)
    }

    fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions::from_models(&self.model, &self.model))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Device
    }

    fn is_connected(&self) -> bool {
        self.driver.is_some()
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}
