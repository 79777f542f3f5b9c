use crate::{CoreError, CoreResult, UVec2, Vec2, Vec3};

/// Pinhole camera in the form the path tracer consumes.
///
/// Everything below `up` is derived by [`Camera::new`]; the fields are public
/// so an externally configured camera can be written directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub resolution: UVec2,
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Unit vector from `position` towards `look_at`.
    pub view: Vec3,
    /// Unit vector `view x up`.
    pub right: Vec3,
    /// Horizontal and vertical field of view, in degrees.
    pub fov: Vec2,
    /// Size of one pixel on the image plane at unit distance.
    pub pixel_length: Vec2,
}

impl Camera {
    /// Derive a render camera from the raw scene-file values.
    pub fn new(resolution: UVec2, fovy_deg: f32, position: Vec3, look_at: Vec3, up: Vec3) -> CoreResult<Self> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(CoreError::InvalidResolution(resolution.x, resolution.y));
        }

        let y_scaled = fovy_deg.to_radians().tan();
        let x_scaled = y_scaled * resolution.x as f32 / resolution.y as f32;
        let fovx_deg = x_scaled.atan().to_degrees();

        // `right` depends on the final view direction, so view comes first.
        let view = (look_at - position)
            .try_normalize()
            .ok_or(CoreError::DegenerateCamera("eye and look-at coincide"))?;
        let right = view
            .cross(up)
            .try_normalize()
            .ok_or(CoreError::DegenerateCamera("up is parallel to the view direction"))?;

        Ok(Self {
            resolution,
            position,
            look_at,
            up,
            view,
            right,
            fov: Vec2::new(fovx_deg, fovy_deg),
            pixel_length: Vec2::new(
                2.0 * x_scaled / resolution.x as f32,
                2.0 * y_scaled / resolution.y as f32,
            ),
        })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            resolution: UVec2::ZERO,
            position: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            up: Vec3::Y,
            view: Vec3::NEG_Z,
            right: Vec3::X,
            fov: Vec2::ZERO,
            pixel_length: Vec2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn horizontal_fov_widens_with_aspect() {
        let cam = Camera::new(
            UVec2::new(800, 600),
            45.0,
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::Y,
        )
        .expect("valid camera");
        assert!(cam.fov.x > 45.0);
        assert_abs_diff_eq!(cam.fov.y, 45.0);
        let expected = (45f32.to_radians().tan() * 800.0 / 600.0).atan().to_degrees();
        assert_abs_diff_eq!(cam.fov.x, expected, epsilon = 1e-4);
    }

    #[test]
    fn right_is_derived_from_final_view() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let look_at = Vec3::new(-4.0, 0.5, -2.0);
        let up = Vec3::Y;
        let cam = Camera::new(UVec2::new(800, 600), 45.0, eye, look_at, up).expect("valid camera");
        let view = (look_at - eye).normalize();
        let right = view.cross(up).normalize();
        assert_abs_diff_eq!(cam.view.x, view.x, epsilon = 1e-6);
        assert_abs_diff_eq!(cam.view.z, view.z, epsilon = 1e-6);
        assert_abs_diff_eq!(cam.right.x, right.x, epsilon = 1e-6);
        assert_abs_diff_eq!(cam.right.y, right.y, epsilon = 1e-6);
        assert_abs_diff_eq!(cam.right.z, right.z, epsilon = 1e-6);
        // Never the default view's right vector.
        assert!((cam.right - Vec3::X).length() > 1e-3);
    }

    #[test]
    fn pixel_length_spans_the_image_plane() {
        let cam = Camera::new(UVec2::new(400, 400), 45.0, Vec3::ZERO, Vec3::NEG_Z, Vec3::Y).expect("valid camera");
        assert_abs_diff_eq!(cam.pixel_length.x * 400.0, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(cam.pixel_length.y * 400.0, 2.0, epsilon = 1e-4);
        assert_eq!(cam.pixel_count(), 160_000);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(
            Camera::new(UVec2::new(0, 10), 45.0, Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
            Err(CoreError::InvalidResolution(0, 10))
        );
        assert!(Camera::new(UVec2::new(10, 10), 45.0, Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_err());
        assert!(Camera::new(UVec2::new(10, 10), 45.0, Vec3::ZERO, Vec3::Y, Vec3::Y).is_err());
    }
}
