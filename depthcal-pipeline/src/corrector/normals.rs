//! Integral-image normal estimation over an organized cloud.
//!
//! For each valid point the mean of the valid neighbours right and left of it
//! gives a smoothed horizontal gradient, the means below and above give a
//! vertical one, and their cross product is the normal. Box means come from
//! summed-area tables, so the cost per point is constant in the window size.

use depthcal_data::PointNormal;
use glam::{DVec3, Vec3};

use crate::error::FrameError;

/// Squared length below which a gradient cross product is degenerate.
const MIN_CROSS_LENGTH_SQ: f64 = 1e-12;

/// Normal estimator with summed-area tables reused across frames.
#[derive(Debug)]
pub struct NormalEstimator {
    radius: u32,
    min_valid_fraction: f32,
    sums: Vec<DVec3>,
    counts: Vec<u32>,
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl NormalEstimator {
    /// `neighborhood` is the edge of the square window in pixels.
    pub fn new(neighborhood: usize, min_valid_fraction: f32) -> Result<Self, FrameError> {
        if neighborhood < 3 {
            return Err(FrameError::InvalidNeighborhood(neighborhood));
        }
        Ok(Self {
            radius: (neighborhood / 2) as u32,
            min_valid_fraction: min_valid_fraction.clamp(0.0, 1.0),
            sums: Vec::new(),
            counts: Vec::new(),
        })
    }

    /// Fill in `normal` for every point with enough valid support.
    ///
    /// Points left without support keep a NaN normal.
    pub fn estimate(&mut self, width: u32, height: u32, points: &mut [PointNormal], valid: &[bool]) {
        debug_assert_eq!(points.len(), (width * height) as usize);
        debug_assert_eq!(valid.len(), points.len());

        self.build_tables(width, height, points, valid);

        let r = self.radius;
        if width <= 2 * r || height <= 2 * r {
            return;
        }

        // Each half window is r columns (or rows) by 2r + 1.
        let half_area = (r * (2 * r + 1)) as f32;
        let min_count = ((half_area * self.min_valid_fraction).ceil() as u32).max(1);

        for v in r..height - r {
            for u in r..width - r {
                let i = (v * width + u) as usize;
                if !valid[i] {
                    continue;
                }

                let right = Rect { x0: u + 1, y0: v - r, x1: u + r, y1: v + r };
                let left = Rect { x0: u - r, y0: v - r, x1: u - 1, y1: v + r };
                let down = Rect { x0: u - r, y0: v + 1, x1: u + r, y1: v + r };
                let up = Rect { x0: u - r, y0: v - r, x1: u + r, y1: v - 1 };

                let (Some(right), Some(left), Some(down), Some(up)) = (
                    self.mean(width, right, min_count),
                    self.mean(width, left, min_count),
                    self.mean(width, down, min_count),
                    self.mean(width, up, min_count),
                ) else {
                    continue;
                };

                let n = (right - left).cross(down - up);
                if n.length_squared() < MIN_CROSS_LENGTH_SQ {
                    continue;
                }
                let mut n = n.normalize();
                // Face the sensor at the origin.
                if n.dot(points[i].position.as_dvec3()) > 0.0 {
                    n = -n;
                }
                points[i].normal = n.as_vec3();
            }
        }
    }

    fn build_tables(&mut self, width: u32, height: u32, points: &[PointNormal], valid: &[bool]) {
        let stride = (width + 1) as usize;
        let len = stride * (height + 1) as usize;
        self.sums.clear();
        self.sums.resize(len, DVec3::ZERO);
        self.counts.clear();
        self.counts.resize(len, 0);

        for y in 0..height as usize {
            let mut row_sum = DVec3::ZERO;
            let mut row_count = 0u32;
            for x in 0..width as usize {
                let i = y * width as usize + x;
                if valid[i] {
                    row_sum += points[i].position.as_dvec3();
                    row_count += 1;
                }
                let t = (y + 1) * stride + x + 1;
                self.sums[t] = self.sums[t - stride] + row_sum;
                self.counts[t] = self.counts[t - stride] + row_count;
            }
        }
    }

    /// Mean position of the valid points in `rect`, if there are enough.
    fn mean(&self, width: u32, rect: Rect, min_count: u32) -> Option<DVec3> {
        let stride = (width + 1) as usize;
        let (x0, y0) = (rect.x0 as usize, rect.y0 as usize);
        let (x1, y1) = (rect.x1 as usize + 1, rect.y1 as usize + 1);

        let a = y0 * stride + x0;
        let b = y0 * stride + x1;
        let c = y1 * stride + x0;
        let d = y1 * stride + x1;

        let count = self.counts[d] + self.counts[a] - self.counts[b] - self.counts[c];
        if count < min_count {
            return None;
        }
        let sum = self.sums[d] + self.sums[a] - self.sums[b] - self.sums[c];
        Some(sum / count as f64)
    }
}

/// Whether `n` is a usable unit normal.
pub fn is_unit(n: Vec3) -> bool {
    !n.is_nan() && (n.length() - 1.0).abs() < 1e-4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32, f: impl Fn(u32, u32) -> Vec3) -> (Vec<PointNormal>, Vec<bool>) {
        let mut points = Vec::new();
        for v in 0..height {
            for u in 0..width {
                points.push(PointNormal::new(f(u, v)));
            }
        }
        let valid = vec![true; points.len()];
        (points, valid)
    }

    #[test]
    fn test_rejects_small_neighborhood() {
        assert_eq!(
            NormalEstimator::new(2, 0.5).unwrap_err(),
            FrameError::InvalidNeighborhood(2)
        );
    }

    #[test]
    fn test_fronto_parallel_plane_faces_camera() {
        let (mut points, valid) = grid(20, 16, |u, v| Vec3::new(u as f32, v as f32, 1000.0));
        let mut ne = NormalEstimator::new(5, 0.5).unwrap();
        ne.estimate(20, 16, &mut points, &valid);

        for v in 0..16u32 {
            for u in 0..20u32 {
                let n = points[(v * 20 + u) as usize].normal;
                let interior = (2..18).contains(&u) && (2..14).contains(&v);
                if interior {
                    assert!(n.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5), "({u},{v}) -> {n}");
                } else {
                    assert!(n.is_nan(), "border ({u},{v}) should have no normal");
                }
            }
        }
    }

    #[test]
    fn test_tilted_plane() {
        // z = x + 100: normal along (1, 0, -1) once oriented toward the origin
        let (mut points, valid) =
            grid(12, 12, |u, v| Vec3::new(u as f32, v as f32, u as f32 + 100.0));
        let mut ne = NormalEstimator::new(3, 0.5).unwrap();
        ne.estimate(12, 12, &mut points, &valid);

        let expected = Vec3::new(1.0, 0.0, -1.0).normalize();
        let n = points[6 * 12 + 6].normal;
        assert!(n.abs_diff_eq(expected, 1e-5), "{n}");
        assert!(is_unit(n));
    }

    #[test]
    fn test_invalid_center_has_no_normal() {
        let (mut points, mut valid) = grid(10, 10, |u, v| Vec3::new(u as f32, v as f32, 500.0));
        valid[5 * 10 + 5] = false;
        points[5 * 10 + 5] = PointNormal::INVALID;
        let mut ne = NormalEstimator::new(3, 0.5).unwrap();
        ne.estimate(10, 10, &mut points, &valid);

        assert!(!points[5 * 10 + 5].has_normal());
        // neighbours still have enough support
        assert!(points[5 * 10 + 4].has_normal());
    }

    #[test]
    fn test_insufficient_support() {
        let (mut points, mut valid) = grid(10, 10, |u, v| Vec3::new(u as f32, v as f32, 500.0));
        // knock out everything left of column 5
        for v in 0..10 {
            for u in 0..5 {
                valid[v * 10 + u] = false;
                points[v * 10 + u] = PointNormal::INVALID;
            }
        }
        let mut ne = NormalEstimator::new(5, 0.5).unwrap();
        ne.estimate(10, 10, &mut points, &valid);

        // (5, 5): the left half window is fully invalid
        assert!(!points[5 * 10 + 5].has_normal());
        // (7, 5): the window lies entirely in the valid half
        assert!(points[5 * 10 + 7].has_normal());
    }

    #[test]
    fn test_tables_are_reused_across_sizes() {
        let mut ne = NormalEstimator::new(3, 0.5).unwrap();
        let (mut big, big_valid) = grid(16, 16, |u, v| Vec3::new(u as f32, v as f32, 10.0));
        ne.estimate(16, 16, &mut big, &big_valid);
        let (mut small, small_valid) = grid(5, 5, |u, v| Vec3::new(u as f32, v as f32, 10.0));
        ne.estimate(5, 5, &mut small, &small_valid);
        assert!(small[2 * 5 + 2].normal.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }
}
