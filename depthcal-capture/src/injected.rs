//! Caller-driven frame source.

use std::sync::Arc;

use depthcal_data::{CameraModel, Dimensions, RawFrame, SourceKind};
use tracing::{debug, trace};

use crate::source::{CaptureError, FrameCallback, FrameSource};

/// A source fed by explicit `submit` calls on the caller's thread.
///
/// Unlike a device it starts streaming as soon as it is connected, since the
/// caller controls the pace anyway.
pub struct InjectedSource {
    rgb_model: Arc<CameraModel>,
    depth_model: Arc<CameraModel>,
    callback: Option<FrameCallback>,
    connected: bool,
    paused: bool,
    submitted: u64,
}

impl InjectedSource {
    pub fn new(rgb_model: Arc<CameraModel>, depth_model: Arc<CameraModel>) -> Self {
        Self {
            rgb_model,
            depth_model,
            callback: None,
            connected: false,
            paused: false,
            submitted: 0,
        }
    }

    /// Hand a frame to the callback synchronously.
    ///
    /// Returns `false` when the frame was discarded because the source is
    /// paused, disconnected, or has no callback.
    pub fn submit(&mut self, mut frame: RawFrame) -> bool {
        if !self.connected || self.paused {
            trace!(index = frame.index, "Injected frame discarded");
            return false;
        }
        let Some(callback) = self.callback.as_ref() else {
            return false;
        };
        frame.source = SourceKind::Injected;
        self.submitted += 1;
        callback(frame);
        true
    }

    /// Frames delivered to the callback so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl FrameSource for InjectedSource {
    fn connect(&mut self, _device_index: u32) -> Result<(), CaptureError> {
        self.connected = true;
        debug!("Injected source attached");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            debug!(submitted = self.submitted, "Injected source detached");
        }
        self.connected = false;
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn on_frame(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    fn intrinsics(&self) -> Option<CameraModel> {
        Some(*self.rgb_model)
    }

    fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions::from_models(&self.rgb_model, &self.depth_model))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Injected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::uniform_frame;
    use std::sync::Mutex;

    fn source() -> InjectedSource {
        let model = Arc::new(CameraModel::new(1.0, 1.0, 0.0, 0.0, 4, 3));
        InjectedSource::new(Arc::clone(&model), model)
    }

    #[test]
    fn test_submit_reaches_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let mut src = source();
        src.on_frame(Arc::new(move |frame: RawFrame| {
            seen_clone.lock().unwrap().push((frame.index, frame.source));
        }));
        src.connect(0).unwrap();

        assert!(src.submit(uniform_frame(4, 3, 100, 1)));
        assert!(src.submit(uniform_frame(4, 3, 100, 2)));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, SourceKind::Injected), (2, SourceKind::Injected)]
        );
        assert_eq!(src.submitted(), 2);
    }

    #[test]
    fn test_paused_or_disconnected_discards() {
        let mut src = source();
        src.on_frame(Arc::new(|_| panic!("callback must not run")));
        assert!(!src.submit(uniform_frame(4, 3, 100, 1)));

        src.connect(0).unwrap();
        src.set_paused(true);
        assert!(!src.submit(uniform_frame(4, 3, 100, 2)));
        assert_eq!(src.submitted(), 0);
    }

    #[test]
    fn test_reports_model_dimensions() {
        let src = source();
        assert_eq!(src.dimensions(), Some(Dimensions::new(4, 3, 4, 3)));
        assert_eq!(src.kind(), SourceKind::Injected);
    }
}
