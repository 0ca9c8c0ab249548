//! Point and transform primitives for organized point clouds.
//!
//! `PointNormal` is `repr(C)` and `Pod` so a whole cloud can be handed to a
//! renderer or an interop layer as a byte slice without copying.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// A camera-space point with its surface normal.
///
/// Invalid positions and missing normals are stored as NaN.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointNormal {
    /// Position in millimetres.
    pub position: Vec3,
    /// Unit surface normal.
    pub normal: Vec3,
}

impl PointNormal {
    /// The placeholder written to invalid raster slots.
    pub const INVALID: Self = Self {
        position: Vec3::NAN,
        normal: Vec3::NAN,
    };

    /// A point without a normal.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            normal: Vec3::NAN,
        }
    }

    pub fn with_normal(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }

    pub fn has_position(&self) -> bool {
        !self.position.is_nan()
    }

    pub fn has_normal(&self) -> bool {
        !self.normal.is_nan()
    }
}

impl Default for PointNormal {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Rotation followed by translation: `p' = R·p + T`.
///
/// Serialized with a row-major rotation so configuration files read the way
/// the matrix is written on paper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransformRows", into = "TransformRows")]
pub struct RigidTransform {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a row-major 3×3 rotation and a translation vector.
    pub fn from_rows(rows: [[f32; 3]; 3], translation: [f32; 3]) -> Self {
        Self {
            rotation: Mat3::from_cols_array_2d(&rows).transpose(),
            translation: Vec3::from_array(translation),
        }
    }

    /// Rotation rows, row-major.
    pub fn rows(&self) -> [[f32; 3]; 3] {
        self.rotation.transpose().to_cols_array_2d()
    }

    #[inline]
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Normals only rotate.
    #[inline]
    pub fn apply_normal(&self, n: Vec3) -> Vec3 {
        self.rotation * n
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Serialize, Deserialize)]
struct TransformRows {
    rotation: [[f32; 3]; 3],
    translation: [f32; 3],
}

impl From<TransformRows> for RigidTransform {
    fn from(rows: TransformRows) -> Self {
        Self::from_rows(rows.rotation, rows.translation)
    }
}

impl From<RigidTransform> for TransformRows {
    fn from(transform: RigidTransform) -> Self {
        Self {
            rotation: transform.rows(),
            translation: transform.translation.to_array(),
        }
    }
}
