//! The frame source capability shared by device and injected producers.

use std::sync::Arc;

use depthcal_data::{CameraModel, Dimensions, RawFrame, SourceKind};
use thiserror::Error;

/// Errors that can occur while opening or driving a source.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Source is not connected")]
    NotConnected,

    #[error("Failed to start driver thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Receives every frame a source produces.
///
/// Device sources call it from their driver thread; injected sources call it
/// from the submitting thread.
pub type FrameCallback = Arc<dyn Fn(RawFrame) + Send + Sync>;

/// A producer of raw RGB-D frames.
///
/// This is the extension point for hardware drivers: implement it for a
/// driver session and hand a factory for it to the pipeline controller.
/// Implementations must not invoke the callback after `disconnect` returns.
pub trait FrameSource: Send {
    /// Open the device at `device_index`.
    ///
    /// A freshly connected source starts paused.
    fn connect(&mut self, device_index: u32) -> Result<(), CaptureError>;

    /// Close the device. Idempotent.
    fn disconnect(&mut self);

    /// Stop or resume frame delivery.
    fn set_paused(&mut self, paused: bool);

    /// Register the frame callback, replacing any previous one.
    fn on_frame(&mut self, callback: FrameCallback);

    /// Intrinsics reported by the device, if it knows them.
    fn intrinsics(&self) -> Option<CameraModel>;

    /// Stream dimensions reported by the device, if it knows them.
    fn dimensions(&self) -> Option<Dimensions>;

    fn kind(&self) -> SourceKind;

    fn is_connected(&self) -> bool;
}
