use crate::{DVec3, Interval};

/// Axis-Aligned Bounding Box.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Bounds are inclusive: a point on a face is inside.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: DVec3, b: DVec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            x: Interval::new(min.x, max.x),
            y: Interval::new(min.y, max.y),
            z: Interval::new(min.z, max.z),
        }
    }

    /// Create the AABB of a cloud of points.
    pub fn enclosing(points: &[DVec3]) -> Self {
        points.iter().fold(Aabb::EMPTY, |acc, &p| {
            Aabb::surrounding(&acc, &Aabb::from_points(p, p))
        })
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> DVec3 {
        DVec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> DVec3 {
        DVec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: DVec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Fold a point into this box treated as a periodic cell.
    pub fn wrap(&self, p: DVec3) -> DVec3 {
        DVec3::new(self.x.wrap(p.x), self.y.wrap(p.y), self.z.wrap(p.z))
    }

    /// All 8 corners.
    pub fn corners(&self) -> [DVec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        [
            DVec3::new(lo.x, lo.y, lo.z),
            DVec3::new(hi.x, lo.y, lo.z),
            DVec3::new(lo.x, hi.y, lo.z),
            DVec3::new(hi.x, hi.y, lo.z),
            DVec3::new(lo.x, lo.y, hi.z),
            DVec3::new(hi.x, lo.y, hi.z),
            DVec3::new(lo.x, hi.y, hi.z),
            DVec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Distance from the world origin to the farthest corner.
    ///
    /// This is the radius of the origin-centred sphere that encloses the box,
    /// which is what a camera orbiting the origin has to scan through.
    pub fn origin_radius(&self) -> f64 {
        self.corners()
            .iter()
            .map(|c| c.length())
            .fold(0.0, f64::max)
    }

    /// Empty box, the identity for [`Aabb::surrounding`].
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
