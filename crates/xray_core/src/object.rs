//! Density-field tree.
//!
//! An [`Object`] is built once from a validated descriptor and is immutable
//! afterwards, so it can be shared across render threads by reference.

use std::fmt;
use std::path::Path;

use xray_math::{Aabb, DVec3, Interval};

use crate::descriptor::{CollectionDesc, ObjectDesc, TessellationDesc, UnitCellDesc};
use crate::loader::{finite, LoadError, LoadResult};
use crate::primitive::{Cuboid, Cylinder, Gyroid, Parallelepiped, Primitive, Sphere};
use crate::voxel::VoxelGrid;

/// Anything that can be sampled for attenuation.
pub trait DensityField: Send + Sync {
    /// Attenuation coefficient at `p`, never negative.
    fn density(&self, p: DVec3) -> f64;
}

/// Ordered aggregate of child objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub objects: Vec<Object>,
    /// Return the first positive child instead of the clipped sum.
    pub greedy: bool,
}

impl Composite {
    pub fn new(objects: Vec<Object>, greedy: bool) -> LoadResult<Self> {
        if objects.is_empty() {
            return Err(LoadError::EmptyCollection);
        }
        Ok(Self { objects, greedy })
    }

    pub fn density(&self, p: DVec3) -> f64 {
        if self.greedy {
            self.objects
                .iter()
                .map(|o| o.density(p))
                .find(|&rho| rho > 0.0)
                .unwrap_or(0.0)
        } else {
            let sum: f64 = self.objects.iter().map(|o| o.density(p)).sum();
            sum.clamp(0.0, 1.0)
        }
    }

    pub fn min_feature_size(&self) -> f64 {
        self.objects
            .iter()
            .map(Object::min_feature_size)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.objects.iter().try_fold(Aabb::EMPTY, |acc, o| {
            o.bounds().map(|b| Aabb::surrounding(&acc, &b))
        })
    }

    fn to_desc(&self) -> CollectionDesc {
        CollectionDesc {
            objects: self.objects.iter().map(Object::to_descriptor).collect(),
            greedy_dens_eval: self.greedy,
        }
    }
}

/// A composite restricted to an inclusive axis-aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    pub objects: Composite,
    pub bounds: Aabb,
}

impl UnitCell {
    /// Members of a unit cell are evaluated greedily regardless of the
    /// collection's own flag.
    pub fn new(mut objects: Composite, bounds: Aabb) -> Self {
        objects.greedy = true;
        Self { objects, bounds }
    }

    pub fn density(&self, p: DVec3) -> f64 {
        if self.bounds.contains(p) {
            self.objects.density(p)
        } else {
            0.0
        }
    }

    fn to_desc(&self) -> UnitCellDesc {
        let (lo, hi) = (self.bounds.min(), self.bounds.max());
        UnitCellDesc {
            objects: Box::new(ObjectDesc::ObjectCollection(self.objects.to_desc())),
            xmin: lo.x,
            xmax: hi.x,
            ymin: lo.y,
            ymax: hi.y,
            zmin: lo.z,
            zmax: hi.z,
        }
    }
}

/// A unit cell repeated periodically over an outer box.
#[derive(Debug, Clone, PartialEq)]
pub struct TessellatedField {
    pub cell: UnitCell,
    pub bounds: Aabb,
}

impl TessellatedField {
    pub fn new(cell: UnitCell, bounds: Aabb) -> Self {
        Self { cell, bounds }
    }

    pub fn density(&self, p: DVec3) -> f64 {
        if !self.bounds.contains(p) {
            return 0.0;
        }
        self.cell.density(self.cell.bounds.wrap(p))
    }
}

/// A node of the density-field tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Primitive(Primitive),
    Composite(Composite),
    UnitCell(UnitCell),
    Tessellated(TessellatedField),
}

impl Object {
    /// Build a validated tree from a descriptor.
    ///
    /// `base_dir` is used to resolve relative voxel file paths.
    pub fn from_descriptor(desc: &ObjectDesc, base_dir: Option<&Path>) -> LoadResult<Self> {
        let object: Object = match desc {
            ObjectDesc::Sphere {
                center,
                radius,
                rho,
            } => Primitive::Sphere(Sphere::new(finite_vec("center", *center)?, *radius, *rho)?)
                .into(),
            ObjectDesc::Cube { center, side, rho } => Primitive::Cuboid(Cuboid::new(
                finite_vec("center", *center)?,
                DVec3::splat(*side),
                *rho,
            )?)
            .into(),
            ObjectDesc::Cuboid { center, sides, rho } => Primitive::Cuboid(Cuboid::new(
                finite_vec("center", *center)?,
                *sides,
                *rho,
            )?)
            .into(),
            ObjectDesc::Cylinder {
                p0,
                p1,
                radius,
                rho,
            } => Primitive::Cylinder(Cylinder::new(
                finite_vec("p0", *p0)?,
                finite_vec("p1", *p1)?,
                *radius,
                *rho,
            )?)
            .into(),
            ObjectDesc::Parallelepiped {
                origin,
                v0,
                v1,
                v2,
                rho,
            } => Primitive::Parallelepiped(Parallelepiped::new(
                finite_vec("origin", *origin)?,
                *v0,
                *v1,
                *v2,
                *rho,
            )?)
            .into(),
            ObjectDesc::Gyroid {
                center,
                scale,
                thickness,
                rho,
            } => Primitive::Gyroid(Gyroid::new(
                finite_vec("center", *center)?,
                *scale,
                *thickness,
                *rho,
            )?)
            .into(),
            ObjectDesc::VoxelGrid(v) => {
                let grid = match (&v.path, &v.rho) {
                    (Some(path), _) => {
                        let resolved = resolve_path(path, base_dir);
                        VoxelGrid::from_raw(path, &resolved, v.resolution, v.dtype)?
                    }
                    (None, Some(rho)) => VoxelGrid::new(v.resolution, rho.clone())?,
                    (None, None) => {
                        return Err(LoadError::invalid(
                            "path",
                            "voxel grid needs either `path` or inline `rho`",
                        ))
                    }
                };
                Primitive::VoxelGrid(grid).into()
            }
            ObjectDesc::ObjectCollection(c) => Object::Composite(composite(c, base_dir)?),
            ObjectDesc::UnitCell(uc) => Object::UnitCell(unit_cell(uc, base_dir)?),
            ObjectDesc::TessellatedObjColl(t) => Object::Tessellated(tessellation(t, base_dir)?),
        };
        Ok(object)
    }

    /// Serializable form of this tree.
    pub fn to_descriptor(&self) -> ObjectDesc {
        match self {
            Object::Primitive(p) => p.to_descriptor(),
            Object::Composite(c) => ObjectDesc::ObjectCollection(c.to_desc()),
            Object::UnitCell(uc) => ObjectDesc::UnitCell(uc.to_desc()),
            Object::Tessellated(t) => {
                let (lo, hi) = (t.bounds.min(), t.bounds.max());
                ObjectDesc::TessellatedObjColl(TessellationDesc {
                    uc: t.cell.to_desc(),
                    xmin: lo.x,
                    xmax: hi.x,
                    ymin: lo.y,
                    ymax: hi.y,
                    zmin: lo.z,
                    zmax: hi.z,
                })
            }
        }
    }

    #[inline]
    pub fn density(&self, p: DVec3) -> f64 {
        match self {
            Object::Primitive(prim) => prim.density(p),
            Object::Composite(c) => c.density(p),
            Object::UnitCell(uc) => uc.density(p),
            Object::Tessellated(t) => t.density(p),
        }
    }

    /// Smallest geometric length scale in the tree.
    pub fn min_feature_size(&self) -> f64 {
        match self {
            Object::Primitive(prim) => prim.min_feature_size(),
            Object::Composite(c) => c.min_feature_size(),
            Object::UnitCell(uc) => uc.objects.min_feature_size(),
            Object::Tessellated(t) => t.cell.objects.min_feature_size(),
        }
    }

    /// Axis-aligned support of the tree, `None` if unbounded.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Object::Primitive(prim) => prim.bounds(),
            Object::Composite(c) => c.bounds(),
            Object::UnitCell(uc) => Some(uc.bounds),
            Object::Tessellated(t) => Some(t.bounds),
        }
    }
}

impl From<Primitive> for Object {
    fn from(p: Primitive) -> Self {
        Object::Primitive(p)
    }
}

impl DensityField for Object {
    fn density(&self, p: DVec3) -> f64 {
        Object::density(self, p)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Primitive(p) => write!(f, "{}", p),
            Object::Composite(c) => write!(
                f,
                "ObjectCollection{{{} objects, greedy: {}}}",
                c.objects.len(),
                c.greedy
            ),
            Object::UnitCell(uc) => write!(
                f,
                "UnitCell{{{} objects, min: {}, max: {}}}",
                uc.objects.objects.len(),
                uc.bounds.min(),
                uc.bounds.max()
            ),
            Object::Tessellated(t) => write!(
                f,
                "TessellatedObjColl{{cell: {} objects, min: {}, max: {}}}",
                t.cell.objects.objects.len(),
                t.bounds.min(),
                t.bounds.max()
            ),
        }
    }
}

fn resolve_path(path: &Path, base_dir: Option<&Path>) -> std::path::PathBuf {
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn finite_vec(field: &'static str, v: DVec3) -> LoadResult<DVec3> {
    for c in v.to_array() {
        finite(field, c)?;
    }
    Ok(v)
}

fn bounded(field: &'static str, min: f64, max: f64) -> LoadResult<Interval> {
    finite(field, min)?;
    finite(field, max)?;
    if min >= max {
        return Err(LoadError::invalid(
            field,
            format!("empty range [{}, {}]", min, max),
        ));
    }
    Ok(Interval::new(min, max))
}

fn box_from(
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    zmin: f64,
    zmax: f64,
) -> LoadResult<Aabb> {
    Ok(Aabb::new(
        bounded("xmax", xmin, xmax)?,
        bounded("ymax", ymin, ymax)?,
        bounded("zmax", zmin, zmax)?,
    ))
}

fn composite(desc: &CollectionDesc, base_dir: Option<&Path>) -> LoadResult<Composite> {
    let objects = desc
        .objects
        .iter()
        .map(|d| Object::from_descriptor(d, base_dir))
        .collect::<LoadResult<Vec<_>>>()?;
    Composite::new(objects, desc.greedy_dens_eval)
}

fn unit_cell(desc: &UnitCellDesc, base_dir: Option<&Path>) -> LoadResult<UnitCell> {
    let collection = match desc.objects.as_ref() {
        ObjectDesc::ObjectCollection(c) => composite(c, base_dir)?,
        other => return Err(LoadError::UnitCellObjects(other.type_name())),
    };
    let bounds = box_from(desc.xmin, desc.xmax, desc.ymin, desc.ymax, desc.zmin, desc.zmax)?;
    Ok(UnitCell::new(collection, bounds))
}

fn tessellation(desc: &TessellationDesc, base_dir: Option<&Path>) -> LoadResult<TessellatedField> {
    let cell = unit_cell(&desc.uc, base_dir)?;
    let bounds = box_from(desc.xmin, desc.xmax, desc.ymin, desc.ymax, desc.zmin, desc.zmax)?;
    Ok(TessellatedField::new(cell, bounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_object_from_str;

    fn sphere(center: DVec3, radius: f64, rho: f64) -> Object {
        Primitive::Sphere(Sphere::new(center, radius, rho).unwrap()).into()
    }

    fn cube_cell() -> UnitCell {
        let members = Composite::new(vec![sphere(DVec3::splat(0.3), 0.2, 1.0)], false).unwrap();
        UnitCell::new(
            members,
            Aabb::from_points(DVec3::ZERO, DVec3::ONE),
        )
    }

    #[test]
    fn test_sum_is_clipped() {
        let overlap = Composite::new(
            vec![
                sphere(DVec3::ZERO, 1.0, 0.7),
                sphere(DVec3::ZERO, 1.0, 0.6),
            ],
            false,
        )
        .unwrap();
        assert_eq!(overlap.density(DVec3::ZERO), 1.0);

        let light = Composite::new(
            vec![
                sphere(DVec3::ZERO, 1.0, 0.2),
                sphere(DVec3::ZERO, 1.0, 0.3),
            ],
            false,
        )
        .unwrap();
        assert!((light.density(DVec3::ZERO) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_greedy_returns_first_positive() {
        let c = Composite::new(
            vec![
                sphere(DVec3::new(5.0, 0.0, 0.0), 0.5, 0.9),
                sphere(DVec3::ZERO, 1.0, 0.4),
                sphere(DVec3::ZERO, 1.0, 0.8),
            ],
            true,
        )
        .unwrap();
        assert_eq!(c.density(DVec3::ZERO), 0.4);
        assert_eq!(c.density(DVec3::new(0.0, 3.0, 0.0)), 0.0);
    }

    #[test]
    fn test_empty_collection_rejected() {
        assert!(matches!(
            Composite::new(Vec::new(), false),
            Err(LoadError::EmptyCollection)
        ));
    }

    #[test]
    fn test_unit_cell_forces_greedy_and_clips() {
        let cell = cube_cell();
        assert!(cell.objects.greedy);
        assert_eq!(cell.density(DVec3::splat(0.3)), 1.0);
        // Sphere reaches below zero but the cell cuts it off
        assert_eq!(cell.density(DVec3::new(0.3, 0.3, -0.05)), 0.0);
    }

    #[test]
    fn test_tessellation_periodicity() {
        let field = TessellatedField::new(
            cube_cell(),
            Aabb::from_points(DVec3::splat(-2.0), DVec3::splat(2.0)),
        );

        let base = field.density(DVec3::new(0.3, 0.3, 0.3));
        assert_eq!(base, 1.0);
        assert_eq!(field.density(DVec3::new(1.3, 0.3, 0.3)), base);
        assert_eq!(field.density(DVec3::new(-0.7, 0.3, 0.3)), base);
        assert_eq!(field.density(DVec3::new(-1.7, -1.7, 1.3)), base);

        // Periodic image beyond the outer box
        assert_eq!(field.density(DVec3::new(2.3, 0.3, 0.3)), 0.0);
    }

    #[test]
    fn test_tessellation_from_json() {
        let object = load_object_from_str(
            r#"{
                "type": "tessellated_obj_coll",
                "uc": {
                    "objects": {
                        "type": "object_collection",
                        "objects": [
                            {"type": "cube", "center": [0.5, 0.5, 0.5], "side": 0.5, "rho": 1.0}
                        ]
                    },
                    "xmin": 0, "xmax": 1, "ymin": 0, "ymax": 1, "zmin": 0, "zmax": 1
                },
                "xmin": -2, "xmax": 2, "ymin": -2, "ymax": 2, "zmin": -2, "zmax": 2
            }"#,
            None,
        )
        .unwrap();

        assert_eq!(object.density(DVec3::splat(0.5)), 1.0);
        assert_eq!(object.density(DVec3::new(-0.5, 1.5, 0.5)), 1.0);
        assert_eq!(object.density(DVec3::new(-0.9, 0.5, 0.5)), 0.0);
        assert!((object.min_feature_size() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_unit_cell_requires_collection() {
        let err = load_object_from_str(
            r#"{
                "type": "unit_cell",
                "objects": {"type": "sphere", "center": [0, 0, 0], "radius": 0.5, "rho": 1.0},
                "xmin": 0, "xmax": 1, "ymin": 0, "ymax": 1, "zmin": 0, "zmax": 1
            }"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnitCellObjects("sphere")));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = load_object_from_str(
            r#"{
                "type": "unit_cell",
                "objects": {"type": "object_collection", "objects": [
                    {"type": "sphere", "center": [0, 0, 0], "radius": 0.5, "rho": 1.0}
                ]},
                "xmin": 1, "xmax": 0, "ymin": 0, "ymax": 1, "zmin": 0, "zmax": 1
            }"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidField { field: "xmax", .. }));
    }

    #[test]
    fn test_min_feature_size_is_minimum() {
        let c = Composite::new(
            vec![
                sphere(DVec3::ZERO, 0.5, 1.0),
                sphere(DVec3::ONE, 0.1, 1.0),
            ],
            false,
        )
        .unwrap();
        assert_eq!(c.min_feature_size(), 0.1);
    }

    #[test]
    fn test_bounds_union_and_unbounded() {
        let c = Object::Composite(
            Composite::new(
                vec![
                    sphere(DVec3::ZERO, 0.5, 1.0),
                    sphere(DVec3::new(1.0, 0.0, 0.0), 0.5, 1.0),
                ],
                false,
            )
            .unwrap(),
        );
        let b = c.bounds().unwrap();
        assert_eq!(b.min(), DVec3::new(-0.5, -0.5, -0.5));
        assert_eq!(b.max(), DVec3::new(1.5, 0.5, 0.5));

        let with_gyroid = Object::Composite(
            Composite::new(
                vec![
                    sphere(DVec3::ZERO, 0.5, 1.0),
                    Primitive::Gyroid(Gyroid::new(DVec3::ZERO, 1.0, 0.1, 1.0).unwrap()).into(),
                ],
                false,
            )
            .unwrap(),
        );
        assert!(with_gyroid.bounds().is_none());
    }

    #[test]
    fn test_descriptor_round_trip() {
        let json = r#"{
            "type": "object_collection",
            "greedy_dens_eval": true,
            "objects": [
                {"type": "sphere", "center": [0.1, 0.2, 0.3], "radius": 0.5, "rho": 0.7},
                {"type": "box", "center": [0, 0, 0], "sides": [0.1, 0.2, 0.3], "rho": 1.0},
                {"type": "cylinder", "p0": [0, 0, 0], "p1": [0, 0, 1], "radius": 0.05, "rho": 0.5},
                {"type": "parallelepiped", "origin": [0, 0, 0], "v0": [1, 0, 0], "v1": [0.5, 1, 0], "v2": [0, 0, 1], "rho": 1.0},
                {"type": "gyroid", "center": [0, 0, 0], "scale": 0.2, "thickness": 0.3, "rho": 1.0},
                {"type": "voxel_grid", "resolution": [2, 1, 1], "rho": [0.0, 1.0]}
            ]
        }"#;
        let object = load_object_from_str(json, None).unwrap();

        let desc = object.to_descriptor();
        let text = serde_json::to_string(&desc).unwrap();
        let again = load_object_from_str(&text, None).unwrap();
        assert_eq!(again, object);
    }

    #[test]
    fn test_cube_loads_as_box() {
        let object = load_object_from_str(
            r#"{"type": "cube", "center": [0, 0, 0], "side": 0.4, "rho": 1.0}"#,
            None,
        )
        .unwrap();
        assert_eq!(object.to_descriptor().type_name(), "box");
        assert_eq!(object.density(DVec3::new(0.19, -0.19, 0.19)), 1.0);
    }

    #[test]
    fn test_voxel_path_resolved_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grid.raw"), [0u8, 255]).unwrap();

        let object = load_object_from_str(
            r#"{"type": "voxel_grid", "resolution": [2, 1, 1], "dtype": "uint8", "path": "grid.raw"}"#,
            Some(dir.path()),
        )
        .unwrap();
        assert_eq!(object.density(DVec3::new(1.0, 0.0, 0.0)), 1.0);

        // Path is written back as given
        match object.to_descriptor() {
            ObjectDesc::VoxelGrid(v) => assert_eq!(v.path.unwrap(), Path::new("grid.raw")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
