//! Implicit geometric primitives.
//!
//! Every primitive is an indicator-like field: a constant `rho` inside its
//! support and zero outside. Constructors validate their parameters so the
//! density functions never divide by zero.

use std::fmt;

use xray_math::{Aabb, DMat3, DVec3};

use crate::descriptor::{ObjectDesc, VoxelGridDesc};
use crate::loader::{non_negative, positive, LoadError, LoadResult};
use crate::voxel::{VoxelDtype, VoxelGrid};

/// Solid ball.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
    pub rho: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64, rho: f64) -> LoadResult<Self> {
        Ok(Self {
            center,
            radius: positive("radius", radius)?,
            rho: non_negative("rho", rho)?,
        })
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        if p.distance_squared(self.center) < self.radius * self.radius {
            self.rho
        } else {
            0.0
        }
    }
}

/// Axis-aligned box given by its center and full side lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    pub center: DVec3,
    pub sides: DVec3,
    pub rho: f64,
}

impl Cuboid {
    pub fn new(center: DVec3, sides: DVec3, rho: f64) -> LoadResult<Self> {
        positive("sides", sides.x)?;
        positive("sides", sides.y)?;
        positive("sides", sides.z)?;
        Ok(Self {
            center,
            sides,
            rho: non_negative("rho", rho)?,
        })
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        let d = (p - self.center).abs();
        let half = 0.5 * self.sides;
        if d.x < half.x && d.y < half.y && d.z < half.z {
            self.rho
        } else {
            0.0
        }
    }
}

/// Flat-capped rod around the segment `p0 → p1`.
///
/// Points whose projection falls outside the segment are empty, so the ends
/// are cut square rather than rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    pub p0: DVec3,
    pub p1: DVec3,
    pub radius: f64,
    pub rho: f64,
    axis: DVec3,
    inv_len_sq: f64,
}

impl Cylinder {
    pub fn new(p0: DVec3, p1: DVec3, radius: f64, rho: f64) -> LoadResult<Self> {
        let axis = p1 - p0;
        let len_sq = axis.length_squared();
        if !(len_sq.is_finite() && len_sq > 0.0) {
            return Err(LoadError::invalid(
                "p1",
                format!("segment {:?} -> {:?} has zero length", p0, p1),
            ));
        }
        Ok(Self {
            p0,
            p1,
            radius: positive("radius", radius)?,
            rho: non_negative("rho", rho)?,
            axis,
            inv_len_sq: 1.0 / len_sq,
        })
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        let w = p - self.p0;
        let c = w.dot(self.axis) * self.inv_len_sq;
        if !(0.0..=1.0).contains(&c) {
            return 0.0;
        }
        let perp = w - self.axis * c;
        if perp.length_squared() < self.radius * self.radius {
            self.rho
        } else {
            0.0
        }
    }

    fn bounds(&self) -> Aabb {
        let r = DVec3::splat(self.radius);
        Aabb::from_points(self.p0.min(self.p1) - r, self.p0.max(self.p1) + r)
    }
}

/// Skewed box spanned by three edge vectors from `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parallelepiped {
    pub origin: DVec3,
    pub v0: DVec3,
    pub v1: DVec3,
    pub v2: DVec3,
    pub rho: f64,
    to_local: DMat3,
}

impl Parallelepiped {
    pub fn new(origin: DVec3, v0: DVec3, v1: DVec3, v2: DVec3, rho: f64) -> LoadResult<Self> {
        let basis = DMat3::from_cols(v0, v1, v2);
        let det = basis.determinant();
        if !(det.is_finite() && det.abs() > 1e-12) {
            return Err(LoadError::invalid(
                "v2",
                format!("edge vectors are linearly dependent (det = {})", det),
            ));
        }
        Ok(Self {
            origin,
            v0,
            v1,
            v2,
            rho: non_negative("rho", rho)?,
            to_local: basis.inverse(),
        })
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        let local = self.to_local * (p - self.origin);
        let inside = |t: f64| t > 0.0 && t < 1.0;
        if inside(local.x) && inside(local.y) && inside(local.z) {
            self.rho
        } else {
            0.0
        }
    }

    fn bounds(&self) -> Aabb {
        let o = self.origin;
        let (a, b, c) = (self.v0, self.v1, self.v2);
        Aabb::enclosing(&[
            o,
            o + a,
            o + b,
            o + c,
            o + a + b,
            o + a + c,
            o + b + c,
            o + a + b + c,
        ])
    }
}

/// Thin shell around the gyroid minimal surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Gyroid {
    pub center: DVec3,
    pub scale: f64,
    pub thickness: f64,
    pub rho: f64,
}

impl Gyroid {
    pub fn new(center: DVec3, scale: f64, thickness: f64, rho: f64) -> LoadResult<Self> {
        Ok(Self {
            center,
            scale: positive("scale", scale)?,
            thickness: positive("thickness", thickness)?,
            rho: non_negative("rho", rho)?,
        })
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        let q = (p - self.center) / self.scale;
        let g = q.x.sin() * q.y.cos() + q.y.sin() * q.z.cos() + q.z.sin() * q.x.cos();
        if g.abs() < self.thickness {
            self.rho
        } else {
            0.0
        }
    }
}

/// Closed set of primitive shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Sphere(Sphere),
    Cuboid(Cuboid),
    Cylinder(Cylinder),
    Parallelepiped(Parallelepiped),
    Gyroid(Gyroid),
    VoxelGrid(VoxelGrid),
}

impl Primitive {
    pub fn density(&self, p: DVec3) -> f64 {
        match self {
            Primitive::Sphere(s) => s.density(p),
            Primitive::Cuboid(b) => b.density(p),
            Primitive::Cylinder(c) => c.density(p),
            Primitive::Parallelepiped(pp) => pp.density(p),
            Primitive::Gyroid(g) => g.density(p),
            Primitive::VoxelGrid(v) => v.density(p),
        }
    }

    /// Heuristic length scale used to pick a default integration step.
    pub fn min_feature_size(&self) -> f64 {
        match self {
            Primitive::Sphere(s) => s.radius,
            Primitive::Cuboid(b) => 0.1 * b.sides.min_element(),
            Primitive::Cylinder(c) => c.radius,
            Primitive::Parallelepiped(pp) => {
                0.2 * pp.v0.length().min(pp.v1.length()).min(pp.v2.length())
            }
            Primitive::Gyroid(g) => 0.1 * g.scale * g.thickness,
            Primitive::VoxelGrid(v) => v.min_feature_size(),
        }
    }

    /// Axis-aligned support, `None` for the unbounded gyroid.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Primitive::Sphere(s) => {
                let r = DVec3::splat(s.radius);
                Some(Aabb::from_points(s.center - r, s.center + r))
            }
            Primitive::Cuboid(b) => {
                let half = 0.5 * b.sides;
                Some(Aabb::from_points(b.center - half, b.center + half))
            }
            Primitive::Cylinder(c) => Some(c.bounds()),
            Primitive::Parallelepiped(pp) => Some(pp.bounds()),
            Primitive::Gyroid(_) => None,
            Primitive::VoxelGrid(_) => Some(VoxelGrid::bounds()),
        }
    }

    pub fn to_descriptor(&self) -> ObjectDesc {
        match self {
            Primitive::Sphere(s) => ObjectDesc::Sphere {
                center: s.center,
                radius: s.radius,
                rho: s.rho,
            },
            Primitive::Cuboid(b) => ObjectDesc::Cuboid {
                center: b.center,
                sides: b.sides,
                rho: b.rho,
            },
            Primitive::Cylinder(c) => ObjectDesc::Cylinder {
                p0: c.p0,
                p1: c.p1,
                radius: c.radius,
                rho: c.rho,
            },
            Primitive::Parallelepiped(pp) => ObjectDesc::Parallelepiped {
                origin: pp.origin,
                v0: pp.v0,
                v1: pp.v1,
                v2: pp.v2,
                rho: pp.rho,
            },
            Primitive::Gyroid(g) => ObjectDesc::Gyroid {
                center: g.center,
                scale: g.scale,
                thickness: g.thickness,
                rho: g.rho,
            },
            Primitive::VoxelGrid(v) => {
                let desc = match v.source() {
                    Some((path, dtype)) => VoxelGridDesc {
                        resolution: v.resolution(),
                        dtype,
                        path: Some(path.to_path_buf()),
                        rho: None,
                    },
                    None => VoxelGridDesc {
                        resolution: v.resolution(),
                        dtype: VoxelDtype::Float64,
                        path: None,
                        rho: Some(v.samples().to_vec()),
                    },
                };
                ObjectDesc::VoxelGrid(desc)
            }
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Sphere(s) => write!(
                f,
                "Sphere{{center: {}, radius: {}, rho: {}}}",
                s.center, s.radius, s.rho
            ),
            Primitive::Cuboid(b) => write!(
                f,
                "Box{{center: {}, sides: {}, rho: {}}}",
                b.center, b.sides, b.rho
            ),
            Primitive::Cylinder(c) => write!(
                f,
                "Cylinder{{p0: {}, p1: {}, radius: {}, rho: {}}}",
                c.p0, c.p1, c.radius, c.rho
            ),
            Primitive::Parallelepiped(pp) => write!(
                f,
                "Parallelepiped{{origin: {}, v0: {}, v1: {}, v2: {}, rho: {}}}",
                pp.origin, pp.v0, pp.v1, pp.v2, pp.rho
            ),
            Primitive::Gyroid(g) => write!(
                f,
                "Gyroid{{center: {}, scale: {}, thickness: {}, rho: {}}}",
                g.center, g.scale, g.thickness, g.rho
            ),
            Primitive::VoxelGrid(v) => {
                let [nx, ny, nz] = v.resolution();
                write!(f, "VoxelGrid{{nx: {}, ny: {}, nz: {}}}", nx, ny, nz)
            }
        }
    }
}
