//! Raw and calibrated RGB-D frames.

use std::time::Duration;

use image::{ImageBuffer, Luma, RgbImage};

use crate::types::PointNormal;

/// Row-major 16-bit depth raster.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Which kind of producer delivered a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Pushed by a driver thread.
    Device,
    /// Submitted explicitly by the caller.
    Injected,
}

/// A frame as it leaves the producer.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Depth samples (0 means no measurement).
    pub depth: DepthImage,
    /// RGB pixels in the same raster order as `depth`.
    pub color: RgbImage,
    /// Producer frame index, non-decreasing by convention.
    pub index: u64,
    /// Whether both rasters are horizontally mirrored.
    pub mirrored: bool,
    pub source: SourceKind,
}

impl RawFrame {
    pub fn new(depth: DepthImage, color: RgbImage, index: u64, source: SourceKind) -> Self {
        Self {
            depth,
            color,
            index,
            mirrored: false,
            source,
        }
    }

    /// Wrap plain buffers.
    ///
    /// Returns `None` when a buffer is too small for `width × height`
    /// (`color` holds three bytes per pixel).
    pub fn from_buffers(
        width: u32,
        height: u32,
        depth: Vec<u16>,
        color: Vec<u8>,
        index: u64,
        source: SourceKind,
    ) -> Option<Self> {
        let depth = DepthImage::from_raw(width, height, depth)?;
        let color = RgbImage::from_raw(width, height, color)?;
        Some(Self::new(depth, color, index, source))
    }

    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    /// Depth raster dimensions (width, height).
    pub fn depth_dimensions(&self) -> (u32, u32) {
        self.depth.dimensions()
    }

    /// Color raster dimensions (width, height).
    pub fn color_dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// An organized, registered point cloud with its color.
///
/// `points`, `valid` and the pixels of `color` are aligned 1:1 in raster
/// order. A pass-through frame (calibration disabled) carries empty `points`
/// and `valid`.
#[derive(Debug, Clone)]
pub struct CalibratedFrame {
    pub points: Vec<PointNormal>,
    pub valid: Vec<bool>,
    pub color: RgbImage,
    pub depth: DepthImage,
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Depth and color share one intrinsic matrix.
    pub registered: bool,
    pub normals_computed: bool,
    /// Wall time the worker spent on this frame.
    pub processing_time: Duration,
}

impl CalibratedFrame {
    /// A frame that skipped calibration.
    pub fn pass_through(frame: RawFrame) -> Self {
        let (width, height) = frame.depth_dimensions();
        Self {
            points: Vec::new(),
            valid: Vec::new(),
            color: frame.color,
            depth: frame.depth,
            index: frame.index,
            width,
            height,
            registered: true,
            normals_computed: false,
            processing_time: Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points with a usable position.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// The valid point at pixel `(u, v)`.
    pub fn point_at(&self, u: u32, v: u32) -> Option<&PointNormal> {
        if u >= self.width || v >= self.height {
            return None;
        }
        let i = (v * self.width + u) as usize;
        match self.valid.get(i) {
            Some(true) => self.points.get(i),
            _ => None,
        }
    }

    /// Valid points with their color, in raster order.
    pub fn iter_valid(&self) -> impl Iterator<Item = (&PointNormal, [u8; 3])> + '_ {
        self.points
            .iter()
            .zip(self.valid.iter())
            .zip(self.color.pixels())
            .filter(|((_, valid), _)| **valid)
            .map(|((point, _), rgb)| (point, rgb.0))
    }

    /// The point array as raw bytes (24 bytes per point).
    pub fn points_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn tiny_frame() -> CalibratedFrame {
        let raw = RawFrame::from_buffers(2, 2, vec![0; 4], vec![0; 12], 7, SourceKind::Injected)
            .unwrap();
        let mut frame = CalibratedFrame::pass_through(raw);
        frame.points = vec![
            PointNormal::new(Vec3::new(0.0, 0.0, 1.0)),
            PointNormal::INVALID,
            PointNormal::new(Vec3::new(0.0, 1.0, 1.0)),
            PointNormal::new(Vec3::new(1.0, 1.0, 1.0)),
        ];
        frame.valid = vec![true, false, true, true];
        frame
    }

    #[test]
    fn test_from_buffers_rejects_short_buffers() {
        assert!(RawFrame::from_buffers(4, 4, vec![0; 15], vec![0; 48], 0, SourceKind::Injected).is_none());
        assert!(RawFrame::from_buffers(4, 4, vec![0; 16], vec![0; 47], 0, SourceKind::Injected).is_none());
        assert!(RawFrame::from_buffers(4, 4, vec![0; 16], vec![0; 48], 0, SourceKind::Injected).is_some());
    }

    #[test]
    fn test_pass_through_keeps_index() {
        let raw = RawFrame::from_buffers(3, 2, vec![5; 6], vec![1; 18], 42, SourceKind::Device).unwrap();
        let frame = CalibratedFrame::pass_through(raw);
        assert_eq!(frame.index, 42);
        assert!(frame.is_empty());
        assert!(frame.registered);
        assert!(!frame.normals_computed);
        assert_eq!((frame.width, frame.height), (3, 2));
    }

    #[test]
    fn test_point_at_respects_mask() {
        let frame = tiny_frame();
        assert!(frame.point_at(0, 0).is_some());
        assert!(frame.point_at(1, 0).is_none());
        assert_eq!(frame.point_at(1, 1).unwrap().position, Vec3::new(1.0, 1.0, 1.0));
        assert!(frame.point_at(2, 0).is_none());
        assert_eq!(frame.valid_count(), 3);
        assert_eq!(frame.iter_valid().count(), 3);
    }

    #[test]
    fn test_points_as_bytes() {
        let frame = tiny_frame();
        assert_eq!(frame.points_as_bytes().len(), 4 * 24);
    }
}
