//! Depthcal Capture - RGB-D frame producers
//!
//! This crate provides the `FrameSource` capability trait and its two
//! variants:
//!
//! - Device sources: a driver thread pushes frames through the registered
//!   callback ([`SimulatedDevice`] is the in-tree implementation; hardware
//!   drivers implement the same trait)
//! - Injected sources: the caller submits frames on its own thread
//!   ([`InjectedSource`])
//!
//! Both feed the same callback, so consumers never need to know which one is
//! active.
//!
//! ## Example
//!
//! ```ignore
//! use depthcal_capture::{FrameSource, SimulatedDevice};
//!
//! let mut device = SimulatedDevice::uniform(model, 1000);
//! device.on_frame(Arc::new(|frame| println!("frame {}", frame.index)));
//! device.connect(0)?;
//! device.set_paused(false);
//! ```

pub mod frame_loop;
mod injected;
mod simulated;
mod source;

pub use frame_loop::{LoopAction, LoopThread};
pub use injected::InjectedSource;
pub use simulated::{FrameGenerator, SimulatedDevice, uniform_frame};
pub use source::{CaptureError, FrameCallback, FrameSource};

// Re-export the frame types for convenience
pub use depthcal_data::{CameraModel, Dimensions, RawFrame, SourceKind};
