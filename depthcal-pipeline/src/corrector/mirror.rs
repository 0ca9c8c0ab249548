//! Horizontal mirror correction.

use depthcal_data::RawFrame;
use image::imageops::flip_horizontal_in_place;

/// Reflect every row of both rasters in place and clear the mirrored flag.
///
/// Applying the reflection twice restores the original buffers exactly.
pub fn unmirror(frame: &mut RawFrame) {
    flip_horizontal_in_place(&mut frame.depth);
    flip_horizontal_in_place(&mut frame.color);
    frame.mirrored = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcal_data::{DepthImage, SourceKind};
    use image::{Rgb, RgbImage};

    fn ramp_frame() -> RawFrame {
        let depth = DepthImage::from_fn(5, 3, |x, y| image::Luma([(y * 10 + x) as u16]));
        let color = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8, y as u8, (x * y) as u8]));
        RawFrame::new(depth, color, 0, SourceKind::Device).with_mirrored(true)
    }

    #[test]
    fn test_rows_are_reflected() {
        let mut frame = ramp_frame();
        unmirror(&mut frame);
        assert_eq!(frame.depth.get_pixel(0, 1).0[0], 14);
        assert_eq!(frame.depth.get_pixel(4, 1).0[0], 10);
        assert_eq!(frame.color.get_pixel(0, 2).0, [4, 2, 8]);
        assert!(!frame.mirrored);
    }

    #[test]
    fn test_mirror_is_self_inverse() {
        let original = ramp_frame();
        let mut frame = original.clone();
        unmirror(&mut frame);
        unmirror(&mut frame);
        assert_eq!(frame.depth, original.depth);
        assert_eq!(frame.color, original.color);
    }
}
