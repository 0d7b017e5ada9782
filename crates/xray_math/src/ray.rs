use crate::DVec3;

/// A ray in 3D space with origin and direction.
///
/// Rays represent a line starting at `origin` and traveling in `direction`.
/// The direction is not required to be unit length; integrators call
/// [`Ray::normalized`] before stepping along it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Same ray with a unit-length direction.
    ///
    /// A zero direction stays zero, so every sample lands on the origin.
    pub fn normalized(&self) -> Self {
        Self {
            origin: self.origin,
            direction: self.direction.normalize_or_zero(),
        }
    }

    /// Get the point along the ray at parameter s.
    ///
    /// Returns: origin + s * direction
    #[inline]
    pub fn at(&self, s: f64) -> DVec3 {
        self.origin + self.direction * s
    }
}
