//! Pinhole projection camera orbiting the scene origin.

use xray_math::{DMat4, DVec3, Interval, OrbitCamera, Ray};

/// Camera for generating pixel rays for one projection.
///
/// The image plane sits at `z = -f` in camera space with normalized device
/// coordinates in [-1, 1]², so `f = 1 / tan(fov / 2)`.
#[derive(Debug, Clone)]
pub struct ProjectionCamera {
    pub resolution: u32,
    /// Full field of view in degrees
    pub fov: f64,
    orbit: OrbitCamera,
    eye: DVec3,
    camera_to_world: DMat4,
    focal_length: f64,
}

impl ProjectionCamera {
    /// Camera at azimuthal/polar angles (degrees) and `distance` from the origin.
    pub fn new(azimuthal: f64, polar: f64, distance: f64, fov: f64, resolution: u32) -> Self {
        let orbit = OrbitCamera::new(azimuthal, polar, distance);
        Self {
            resolution,
            fov,
            eye: orbit.eye(),
            camera_to_world: orbit.camera_to_world(),
            focal_length: focal_length(fov),
            orbit,
        }
    }

    pub fn eye(&self) -> DVec3 {
        self.eye
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    pub fn camera_to_world(&self) -> DMat4 {
        self.camera_to_world
    }

    /// Focal length in normalized device units.
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Focal length in pixels.
    pub fn focal_length_px(&self) -> f64 {
        self.focal_length * self.resolution as f64 / 2.0
    }

    /// Principal point in pixels (image centre).
    pub fn principal_point(&self) -> f64 {
        self.resolution as f64 / 2.0
    }

    /// Ray through pixel `(i, j)`, `i` along camera x and `j` along camera y.
    ///
    /// The direction is left unnormalized; integrators normalize it.
    pub fn pixel_ray(&self, i: u32, j: u32) -> Ray {
        let half = self.resolution as f64 / 2.0;
        let on_plane = DVec3::new(
            i as f64 / half - 1.0,
            j as f64 / half - 1.0,
            -self.focal_length,
        );
        let world = self.camera_to_world.transform_point3(on_plane);
        Ray::new(self.eye, world - self.eye)
    }

    /// Ray parameters that cover a sphere of radius `half_width` around the
    /// origin.
    pub fn scan_window(&self, half_width: f64) -> Interval {
        let r = self.orbit.distance;
        Interval::new(r - half_width, r + half_width)
    }
}

/// `1 / tan(fov / 2)` with `fov` in degrees.
pub fn focal_length(fov: f64) -> f64 {
    1.0 / (fov.to_radians() / 2.0).tan()
}
