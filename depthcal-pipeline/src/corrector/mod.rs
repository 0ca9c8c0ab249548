//! Per-frame geometric correction.
//!
//! Steps run in a fixed order, each toggleable through [`CorrectorConfig`]:
//!
//! 1. mirror correction
//! 2. depth back-projection (always)
//! 3. normal estimation
//! 4. rigid transform

pub mod backproject;
pub mod mirror;
pub mod normals;
pub mod transform;

use std::sync::Arc;
use std::time::Instant;

use depthcal_data::{CalibratedFrame, CameraModel, RawFrame};
use tracing::trace;

use crate::config::CorrectorConfig;
use crate::error::FrameError;
use normals::NormalEstimator;

pub use backproject::back_project;
pub use mirror::unmirror;
pub use transform::transform_in_place;

/// Turns raw frames into organized, normal-annotated clouds.
///
/// Owns the scratch tables used by normal estimation; keep one per worker.
#[derive(Debug)]
pub struct Corrector {
    config: CorrectorConfig,
    depth_model: Arc<CameraModel>,
    normals: NormalEstimator,
}

impl Corrector {
    pub fn new(config: CorrectorConfig, depth_model: Arc<CameraModel>) -> Result<Self, FrameError> {
        let normals = NormalEstimator::new(config.normal_neighborhood, config.min_valid_fraction)?;
        Ok(Self {
            config,
            depth_model,
            normals,
        })
    }

    /// Run every enabled step on `frame`.
    pub fn process(&mut self, mut frame: RawFrame) -> Result<CalibratedFrame, FrameError> {
        let started = Instant::now();

        let (width, height) = frame.depth_dimensions();
        let color = frame.color_dimensions();
        if color != (width, height) {
            return Err(FrameError::RasterMismatch {
                depth: (width, height),
                color,
            });
        }
        if !self.depth_model.matches(width, height) {
            return Err(FrameError::ModelMismatch {
                raster: (width, height),
                model: self.depth_model.dimensions(),
            });
        }

        if self.config.mirror && frame.mirrored {
            unmirror(&mut frame);
        }

        let (mut points, valid) =
            back_project(&frame.depth, &self.depth_model, self.config.max_depth_mm);

        if self.config.compute_normals {
            self.normals.estimate(width, height, &mut points, &valid);
        }

        if let Some(transform) = self.config.transform.as_ref().filter(|t| !t.is_identity()) {
            transform_in_place(&mut points, &valid, transform);
        }

        let processing_time = started.elapsed();
        trace!(index = frame.index, ?processing_time, "Frame corrected");

        Ok(CalibratedFrame {
            points,
            valid,
            color: frame.color,
            depth: frame.depth,
            index: frame.index,
            width,
            height,
            registered: true,
            normals_computed: self.config.compute_normals,
            processing_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcal_data::{DepthImage, RigidTransform, SourceKind};
    use glam::{Mat3, Vec3};
    use image::{Luma, Rgb, RgbImage};

    fn model() -> Arc<CameraModel> {
        Arc::new(CameraModel::new(50.0, 50.0, 15.5, 11.5, 32, 24))
    }

    fn frame(depth: u16) -> RawFrame {
        RawFrame::new(
            DepthImage::from_pixel(32, 24, Luma([depth])),
            RgbImage::from_fn(32, 24, |x, _| Rgb([x as u8, 0, 0])),
            3,
            SourceKind::Injected,
        )
    }

    #[test]
    fn test_full_pipeline() {
        let mut corrector = Corrector::new(CorrectorConfig::default(), model()).unwrap();
        let out = corrector.process(frame(1000)).unwrap();

        assert_eq!(out.len(), 32 * 24);
        assert_eq!(out.index, 3);
        assert!(out.registered);
        assert!(out.normals_computed);
        assert_eq!(out.valid_count(), 32 * 24);
        let center = out.point_at(16, 12).unwrap();
        assert!(normals::is_unit(center.normal));
        assert!(center.normal.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-4));
    }

    #[test]
    fn test_steps_can_be_disabled() {
        let config = CorrectorConfig {
            compute_normals: false,
            ..CorrectorConfig::default()
        };
        let mut corrector = Corrector::new(config, model()).unwrap();
        let out = corrector.process(frame(800)).unwrap();
        assert!(!out.normals_computed);
        assert!(out.points.iter().all(|p| !p.has_normal()));
    }

    #[test]
    fn test_mirrored_frame_is_restored() {
        let mut corrector = Corrector::new(CorrectorConfig::default(), model()).unwrap();
        let out = corrector.process(frame(800).with_mirrored(true)).unwrap();
        assert_eq!(out.color.get_pixel(0, 0).0, [31, 0, 0]);

        let config = CorrectorConfig {
            mirror: false,
            ..CorrectorConfig::default()
        };
        let mut corrector = Corrector::new(config, model()).unwrap();
        let out = corrector.process(frame(800).with_mirrored(true)).unwrap();
        assert_eq!(out.color.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_transform_applies_after_normals() {
        let config = CorrectorConfig {
            transform: Some(RigidTransform::new(
                Mat3::from_rotation_x(std::f32::consts::PI),
                Vec3::new(0.0, 0.0, 2000.0),
            )),
            ..CorrectorConfig::default()
        };
        let mut corrector = Corrector::new(config, model()).unwrap();
        let out = corrector.process(frame(1000)).unwrap();
        let center = out.point_at(16, 12).unwrap();
        assert!((center.position.z - 1000.0).abs() < 1e-2);
        assert!(center.normal.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-4));
    }

    #[test]
    fn test_identity_transform_leaves_points() {
        let config = CorrectorConfig {
            transform: Some(RigidTransform::IDENTITY),
            ..CorrectorConfig::default()
        };
        let mut with_identity = Corrector::new(config, model()).unwrap();
        let mut plain = Corrector::new(CorrectorConfig::default(), model()).unwrap();

        let a = with_identity.process(frame(1000)).unwrap();
        let b = plain.process(frame(1000)).unwrap();
        let (pa, pb) = (a.point_at(3, 4).unwrap(), b.point_at(3, 4).unwrap());
        assert_eq!(pa.position, pb.position);
        assert_eq!(pa.normal.is_nan(), pb.normal.is_nan());
    }

    #[test]
    fn test_raster_mismatch() {
        let mut corrector = Corrector::new(CorrectorConfig::default(), model()).unwrap();
        let mut bad = frame(1000);
        bad.color = RgbImage::new(16, 24);
        assert_eq!(
            corrector.process(bad).unwrap_err(),
            FrameError::RasterMismatch {
                depth: (32, 24),
                color: (16, 24)
            }
        );
    }

    #[test]
    fn test_model_mismatch() {
        let mut corrector = Corrector::new(CorrectorConfig::default(), model()).unwrap();
        let small = RawFrame::new(
            DepthImage::from_pixel(8, 8, Luma([10])),
            RgbImage::new(8, 8),
            0,
            SourceKind::Device,
        );
        assert!(matches!(
            corrector.process(small),
            Err(FrameError::ModelMismatch { .. })
        ));
    }
}
