//! Depthcal Data Crate
//!
//! Plain data types shared by every stage of the depthcal pipeline: camera
//! models, raw RGB-D frames, organized point clouds and rigid transforms.
//! This crate is thread-agnostic; the handoff protocol lives in
//! `depthcal-pipeline`.

pub mod camera;
pub mod frame;
pub mod types;

pub use camera::{CameraModel, Dimensions};
pub use frame::{CalibratedFrame, DepthImage, RawFrame, SourceKind};
pub use types::{PointNormal, RigidTransform};
