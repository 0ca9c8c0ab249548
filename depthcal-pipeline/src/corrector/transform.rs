//! In-place rigid transform of an organized cloud.

use depthcal_data::{PointNormal, RigidTransform};

/// Apply `transform` to every valid point, reusing the input buffer.
///
/// Positions are rotated and translated; normals are only rotated. Invalid
/// slots are left untouched.
pub fn transform_in_place(points: &mut [PointNormal], valid: &[bool], transform: &RigidTransform) {
    for (point, _) in points.iter_mut().zip(valid).filter(|(_, valid)| **valid) {
        point.position = transform.apply_point(point.position);
        if point.has_normal() {
            point.normal = transform.apply_normal(point.normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Vec3};

    fn cloud() -> (Vec<PointNormal>, Vec<bool>) {
        let points = vec![
            PointNormal::with_normal(Vec3::X, Vec3::new(0.0, 0.0, -1.0)),
            PointNormal::with_normal(Vec3::Y, Vec3::X),
            PointNormal::INVALID,
            PointNormal::new(Vec3::new(-3.5, 2.25, 1000.0)),
        ];
        (points, vec![true, true, false, true])
    }

    #[test]
    fn test_identity_leaves_cloud_unchanged() {
        let (mut points, valid) = cloud();
        let before = points.clone();
        transform_in_place(&mut points, &valid, &RigidTransform::IDENTITY);

        for (a, b) in points.iter().zip(before.iter()) {
            assert_eq!(a.position.is_nan(), b.position.is_nan());
            if a.has_position() {
                assert_eq!(a.position, b.position);
            }
            if a.has_normal() {
                assert_eq!(a.normal, b.normal);
            }
        }
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let (mut points, valid) = cloud();
        let t = RigidTransform::new(Mat3::from_rotation_z(std::f32::consts::FRAC_PI_2), Vec3::ZERO);
        transform_in_place(&mut points, &valid, &t);

        assert!(points[0].position.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(points[1].position.abs_diff_eq(-Vec3::X, 1e-6));
        assert!(points[1].normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(points[3].position.abs_diff_eq(Vec3::new(-2.25, -3.5, 1000.0), 1e-4));
        assert!(!points[2].has_position());
    }

    #[test]
    fn test_translation_moves_points_not_normals() {
        let (mut points, valid) = cloud();
        let t = RigidTransform::new(Mat3::IDENTITY, Vec3::new(0.0, 0.0, 500.0));
        transform_in_place(&mut points, &valid, &t);

        assert_eq!(points[0].position, Vec3::new(1.0, 0.0, 500.0));
        assert_eq!(points[0].normal, Vec3::new(0.0, 0.0, -1.0));
        assert!(!points[3].has_normal());
    }
}
