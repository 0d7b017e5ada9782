use glam::{DMat4, DVec3};

/// Camera placed on a sphere around the world origin, looking at it.
///
/// Angles follow the physics convention: `polar` is measured from +Z, so
/// 90° is the equatorial plane and 0° looks straight down the pole.
/// World +Z is the up vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Azimuthal angle in degrees, measured from +X towards +Y
    pub azimuthal: f64,
    /// Polar angle in degrees, measured from +Z
    pub polar: f64,
    /// Distance from the origin
    pub distance: f64,
}

impl OrbitCamera {
    /// Create a new orbit camera.
    pub fn new(azimuthal: f64, polar: f64, distance: f64) -> Self {
        Self {
            azimuthal,
            polar,
            distance,
        }
    }

    /// Eye position: R·(cosθ·sinφ, sinθ·sinφ, cosφ).
    pub fn eye(&self) -> DVec3 {
        let theta = self.azimuthal.to_radians();
        let phi = self.polar.to_radians();
        self.distance
            * DVec3::new(theta.cos() * phi.sin(), theta.sin() * phi.sin(), phi.cos())
    }

    /// Camera up vector: world +Z, except on the polar axis where +Z is
    /// parallel to the view direction.
    ///
    /// There the limit of the projected +Z as the pole is approached along
    /// this azimuth is used instead, so pole views line up with their
    /// neighbours.
    pub fn up(&self) -> DVec3 {
        let eye = self.eye();
        if eye.cross(DVec3::Z).length_squared() > 1e-12 * eye.length_squared() {
            return DVec3::Z;
        }
        let theta = self.azimuthal.to_radians();
        let phi = self.polar.to_radians();
        -DVec3::new(theta.cos() * phi.cos(), theta.sin() * phi.cos(), -phi.sin())
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.eye(), DVec3::ZERO, self.up())
    }

    /// Get the camera-to-world matrix (inverse of the view matrix).
    pub fn camera_to_world(&self) -> DMat4 {
        self.view_matrix().inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_equatorial() {
        let camera = OrbitCamera::new(0.0, 90.0, 5.0);
        assert!((camera.eye() - DVec3::new(5.0, 0.0, 0.0)).length() < 1e-12);

        let camera = OrbitCamera::new(90.0, 90.0, 2.0);
        assert!((camera.eye() - DVec3::new(0.0, 2.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_eye_distance() {
        let camera = OrbitCamera::new(37.0, 61.0, 4.0);
        assert!((camera.eye().length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = OrbitCamera::new(30.0, 70.0, 5.0);
        let eye_in_camera = camera.view_matrix().transform_point3(camera.eye());
        assert!(eye_in_camera.length() < 1e-9);
    }

    #[test]
    fn test_camera_looks_down_negative_z() {
        let camera = OrbitCamera::new(120.0, 90.0, 5.0);
        let c2w = camera.camera_to_world();

        // A point straight ahead in camera space lies between eye and origin
        let ahead = c2w.transform_point3(DVec3::new(0.0, 0.0, -1.0));
        let expected = camera.eye() * (4.0 / 5.0);
        assert!((ahead - expected).length() < 1e-9);
    }

    #[test]
    fn test_pole_views_are_finite() {
        for polar in [0.0, 180.0] {
            let camera = OrbitCamera::new(30.0, polar, 5.0);
            let c2w = camera.camera_to_world();
            assert!(c2w.is_finite(), "polar {}: {:?}", polar, c2w);

            let ahead = c2w.transform_point3(DVec3::new(0.0, 0.0, -1.0));
            let expected = camera.eye() * (4.0 / 5.0);
            assert!((ahead - expected).length() < 1e-9);
        }
    }

    #[test]
    fn test_pole_up_matches_nearby_view() {
        let pole = OrbitCamera::new(30.0, 0.0, 5.0).camera_to_world();
        let near = OrbitCamera::new(30.0, 1e-3, 5.0).camera_to_world();
        let up_pole = pole.transform_vector3(DVec3::Y);
        let up_near = near.transform_vector3(DVec3::Y);
        assert!((up_pole - up_near).length() < 1e-2);
    }

    #[test]
    fn test_camera_up_is_world_z() {
        let camera = OrbitCamera::new(0.0, 90.0, 5.0);
        let c2w = camera.camera_to_world();
        let up = c2w.transform_vector3(DVec3::Y);
        assert!((up - DVec3::Z).length() < 1e-9);
    }
}
