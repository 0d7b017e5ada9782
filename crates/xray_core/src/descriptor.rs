//! Serializable entity descriptors.
//!
//! These mirror the JSON documents one to one. Every node carries a `type`
//! discriminant; the loader turns a validated descriptor into an
//! [`Object`](crate::Object) and [`Object::to_descriptor`](crate::Object::to_descriptor)
//! goes back the other way.

use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use xray_math::DVec3;

use crate::voxel::VoxelDtype;

fn default_rho() -> f64 {
    1.0
}

/// Any object node of a descriptor tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDesc {
    Sphere {
        center: DVec3,
        radius: f64,
        rho: f64,
    },
    /// Shorthand for a box with equal sides. Loads as a box.
    Cube {
        center: DVec3,
        side: f64,
        rho: f64,
    },
    #[serde(rename = "box")]
    Cuboid {
        center: DVec3,
        sides: DVec3,
        rho: f64,
    },
    Cylinder {
        p0: DVec3,
        p1: DVec3,
        radius: f64,
        #[serde(default = "default_rho")]
        rho: f64,
    },
    Parallelepiped {
        origin: DVec3,
        v0: DVec3,
        v1: DVec3,
        v2: DVec3,
        rho: f64,
    },
    Gyroid {
        center: DVec3,
        scale: f64,
        thickness: f64,
        rho: f64,
    },
    VoxelGrid(VoxelGridDesc),
    ObjectCollection(CollectionDesc),
    UnitCell(UnitCellDesc),
    TessellatedObjColl(TessellationDesc),
}

impl ObjectDesc {
    /// The `type` discriminant as written in documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectDesc::Sphere { .. } => "sphere",
            ObjectDesc::Cube { .. } => "cube",
            ObjectDesc::Cuboid { .. } => "box",
            ObjectDesc::Cylinder { .. } => "cylinder",
            ObjectDesc::Parallelepiped { .. } => "parallelepiped",
            ObjectDesc::Gyroid { .. } => "gyroid",
            ObjectDesc::VoxelGrid(_) => "voxel_grid",
            ObjectDesc::ObjectCollection(_) => "object_collection",
            ObjectDesc::UnitCell(_) => "unit_cell",
            ObjectDesc::TessellatedObjColl(_) => "tessellated_obj_coll",
        }
    }
}

/// Voxel grid samples, either inline or in a raw file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelGridDesc {
    /// Samples along x, y, z
    pub resolution: [usize; 3],
    /// Sample encoding of the raw file
    #[serde(default)]
    pub dtype: VoxelDtype,
    /// Raw file with NX·NY·NZ samples, x fastest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Inline samples, same layout as the raw file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rho: Option<Vec<f64>>,
}

/// Ordered collection of child objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDesc {
    pub objects: Vec<ObjectDesc>,
    #[serde(default)]
    pub greedy_dens_eval: bool,
}

/// A collection clipped to an axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCellDesc {
    /// Must be an `object_collection`
    pub objects: Box<ObjectDesc>,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

/// A unit cell repeated periodically inside an outer box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TessellationDesc {
    /// Written with `"type": "unit_cell"`; the key is optional on input
    #[serde(serialize_with = "serialize_tagged_unit_cell")]
    pub uc: UnitCellDesc,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

fn serialize_tagged_unit_cell<S: Serializer>(uc: &UnitCellDesc, s: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Tagged<'a> {
        #[serde(rename = "type")]
        kind: &'static str,
        #[serde(flatten)]
        cell: &'a UnitCellDesc,
    }
    Tagged {
        kind: "unit_cell",
        cell: uc,
    }
    .serialize(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_descriptor_json() {
        let desc: ObjectDesc = serde_json::from_str(
            r#"{"type": "sphere", "center": [1, 2, 3], "radius": 0.5, "rho": 1.0}"#,
        )
        .unwrap();

        assert_eq!(
            desc,
            ObjectDesc::Sphere {
                center: DVec3::new(1.0, 2.0, 3.0),
                radius: 0.5,
                rho: 1.0,
            }
        );
        assert_eq!(desc.type_name(), "sphere");
    }

    #[test]
    fn test_box_uses_box_tag() {
        let desc = ObjectDesc::Cuboid {
            center: DVec3::ZERO,
            sides: DVec3::ONE,
            rho: 1.0,
        };
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["type"], "box");
    }

    #[test]
    fn test_cylinder_rho_defaults_to_one() {
        let desc: ObjectDesc = serde_json::from_str(
            r#"{"type": "cylinder", "p0": [0, 0, 0], "p1": [0, 0, 1], "radius": 0.1}"#,
        )
        .unwrap();
        match desc {
            ObjectDesc::Cylinder { rho, .. } => assert_eq!(rho, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_tessellation_json() {
        let desc: ObjectDesc = serde_json::from_str(
            r#"{
                "type": "tessellated_obj_coll",
                "uc": {
                    "type": "unit_cell",
                    "objects": {
                        "type": "object_collection",
                        "objects": [
                            {"type": "sphere", "center": [0.5, 0.5, 0.5], "radius": 0.25, "rho": 1.0}
                        ]
                    },
                    "xmin": 0, "xmax": 1, "ymin": 0, "ymax": 1, "zmin": 0, "zmax": 1
                },
                "xmin": -2, "xmax": 2, "ymin": -2, "ymax": 2, "zmin": -2, "zmax": 2
            }"#,
        )
        .unwrap();

        match desc {
            ObjectDesc::TessellatedObjColl(t) => {
                assert_eq!(t.xmin, -2.0);
                assert_eq!(t.uc.objects.type_name(), "object_collection");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tessellation_writes_unit_cell_tag() {
        let uc = UnitCellDesc {
            objects: Box::new(ObjectDesc::ObjectCollection(CollectionDesc {
                objects: vec![ObjectDesc::Sphere {
                    center: DVec3::splat(0.5),
                    radius: 0.25,
                    rho: 1.0,
                }],
                greedy_dens_eval: true,
            })),
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 1.0,
            zmin: 0.0,
            zmax: 1.0,
        };
        let desc = ObjectDesc::TessellatedObjColl(TessellationDesc {
            uc,
            xmin: -2.0,
            xmax: 2.0,
            ymin: -2.0,
            ymax: 2.0,
            zmin: -2.0,
            zmax: 2.0,
        });

        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["type"], "tessellated_obj_coll");
        assert_eq!(value["uc"]["type"], "unit_cell");
        assert_eq!(value["uc"]["objects"]["type"], "object_collection");
        assert_eq!(value["uc"]["xmax"], 1.0);

        let back: ObjectDesc = serde_json::from_value(value).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_voxel_desc_skips_missing_sources() {
        let desc = ObjectDesc::VoxelGrid(VoxelGridDesc {
            resolution: [2, 1, 1],
            dtype: VoxelDtype::Float64,
            path: None,
            rho: Some(vec![0.0, 1.0]),
        });
        let value = serde_json::to_value(&desc).unwrap();
        assert!(value.get("path").is_none());
        assert_eq!(value["dtype"], "float64");
    }
}
