use crate::{Mat4, Quat, Vec3};

/// Affine transform of a scene object with non-uniform scale.
///
/// Rotation is stored in degrees per axis, as written in scene files.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in degrees (XYZ order).
    pub rotation_deg: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_deg: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_deg: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_deg,
            scale,
        }
    }

    /// Rotation as Rx * Ry * Rz.
    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_x(self.rotation_deg.x.to_radians())
            * Quat::from_rotation_y(self.rotation_deg.y.to_radians())
            * Quat::from_rotation_z(self.rotation_deg.z.to_radians())
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }

    /// Matrix, its inverse and the inverse-transpose used for normals.
    pub fn matrices(&self) -> TransformMatrices {
        let transform = self.matrix();
        let inverse = transform.inverse();
        TransformMatrices {
            transform,
            inverse,
            inv_transpose: inverse.transpose(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Derived matrices of a [`Transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformMatrices {
    pub transform: Mat4,
    pub inverse: Mat4,
    pub inv_transpose: Mat4,
}

impl Default for TransformMatrices {
    fn default() -> Self {
        Transform::identity().matrices()
    }
}
