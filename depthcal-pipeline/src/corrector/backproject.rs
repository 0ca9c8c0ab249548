//! Depth back-projection into an organized cloud.

use depthcal_data::{CameraModel, DepthImage, PointNormal};

/// Back-project every depth sample through `model`.
///
/// Returns one point per raster slot (`v * width + u`) and the matching
/// validity mask. Zero samples, and samples beyond `max_depth_mm` when set,
/// become `PointNormal::INVALID`.
pub fn back_project(
    depth: &DepthImage,
    model: &CameraModel,
    max_depth_mm: Option<f32>,
) -> (Vec<PointNormal>, Vec<bool>) {
    let (width, height) = depth.dimensions();
    let len = (width * height) as usize;
    let mut points = Vec::with_capacity(len);
    let mut valid = Vec::with_capacity(len);
    let max_depth = max_depth_mm.unwrap_or(f32::INFINITY);

    for (u, v, sample) in depth.enumerate_pixels() {
        let d = sample.0[0];
        let z = d as f32 * model.depth_scale_mm;
        if d == 0 || z > max_depth {
            points.push(PointNormal::INVALID);
            valid.push(false);
        } else {
            points.push(PointNormal::new(model.back_project(u, v, z)));
            valid.push(true);
        }
    }

    (points, valid)
}
