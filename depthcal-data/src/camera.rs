//! Pinhole camera models and stream dimensions.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Intrinsic parameters of one stream.
///
/// A model is immutable once attached to a pipeline; share it behind an
/// `Arc` rather than copying it around. Depth and color are registered to
/// one another, so a single model explains both rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Focal length X (pixels).
    pub fx: f32,
    /// Focal length Y (pixels).
    pub fy: f32,
    /// Principal point X (pixels).
    pub cx: f32,
    /// Principal point Y (pixels).
    pub cy: f32,
    /// Multiplier turning a raw depth sample into millimetres.
    #[serde(default = "default_depth_scale")]
    pub depth_scale_mm: f32,
    /// Raster width the model was calibrated for.
    pub width: u32,
    /// Raster height the model was calibrated for.
    pub height: u32,
}

fn default_depth_scale() -> f32 {
    1.0
}

impl CameraModel {
    /// Create a model whose depth samples are already in millimetres.
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            depth_scale_mm: default_depth_scale(),
            width,
            height,
        }
    }

    /// Set the raw-sample-to-millimetre scale.
    pub fn with_depth_scale(mut self, depth_scale_mm: f32) -> Self {
        self.depth_scale_mm = depth_scale_mm;
        self
    }

    /// Raster dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether a raster of the given size matches this model.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Back-project pixel `(u, v)` at depth `z_mm` into camera space.
    #[inline]
    pub fn back_project(&self, u: u32, v: u32, z_mm: f32) -> Vec3 {
        Vec3::new(
            (u as f32 - self.cx) * z_mm / self.fx,
            (v as f32 - self.cy) * z_mm / self.fy,
            z_mm,
        )
    }
}

/// Raster sizes of the color and depth streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rgb_width: u32,
    pub rgb_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
}

impl Dimensions {
    pub fn new(rgb_width: u32, rgb_height: u32, depth_width: u32, depth_height: u32) -> Self {
        Self {
            rgb_width,
            rgb_height,
            depth_width,
            depth_height,
        }
    }

    /// Dimensions described by a pair of camera models.
    pub fn from_models(rgb: &CameraModel, depth: &CameraModel) -> Self {
        Self::new(rgb.width, rgb.height, depth.width, depth.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vga() -> CameraModel {
        CameraModel::new(525.0, 525.0, 319.5, 239.5, 640, 480)
    }

    #[test]
    fn test_back_project_principal_point() {
        let model = vga();
        let p = model.back_project(0, 0, 1000.0);
        assert!((p.x - (-608.5714)).abs() < 1e-2);
        assert!((p.y - (-456.1905)).abs() < 1e-2);
        assert_eq!(p.z, 1000.0);
    }

    #[test]
    fn test_matches() {
        let model = vga();
        assert!(model.matches(640, 480));
        assert!(!model.matches(320, 240));
    }

    #[test]
    fn test_depth_scale_defaults_when_missing() {
        let json = r#"{"fx":1.0,"fy":1.0,"cx":0.0,"cy":0.0,"width":4,"height":3}"#;
        let model: CameraModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.depth_scale_mm, 1.0);
    }

    #[test]
    fn test_dimensions_from_models() {
        let rgb = vga();
        let depth = CameraModel::new(570.0, 570.0, 159.5, 119.5, 320, 240);
        let dims = Dimensions::from_models(&rgb, &depth);
        assert_eq!(dims, Dimensions::new(640, 480, 320, 240));
    }
}
