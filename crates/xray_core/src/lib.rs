//! XRay Core - Density fields, deformations and descriptor loading.
//!
//! This crate provides:
//!
//! - **Density-field tree**: `Object` built from primitives, collections,
//!   unit cells and tessellations
//! - **Deformations**: coordinate warps applied before density lookup
//! - **Loading**: JSON or YAML descriptors with load-time validation
//!
//! # Example
//!
//! ```ignore
//! use xray_core::{load_object, DVec3};
//!
//! let object = load_object("demos/objects/sphere.json")?;
//! println!("Density at origin: {}", object.density(DVec3::ZERO));
//! ```

pub mod deformation;
pub mod descriptor;
pub mod lattice;
pub mod loader;
pub mod object;
pub mod primitive;
pub mod voxel;

// Re-export commonly used types
pub use deformation::{Axis, Deformation};
pub use descriptor::{CollectionDesc, ObjectDesc, TessellationDesc, UnitCellDesc, VoxelGridDesc};
pub use loader::{
    load_deformation, load_deformation_from_str, load_object, load_object_from_str,
    DescriptorFormat, LoadError, LoadResult,
};
pub use object::{Composite, DensityField, Object, TessellatedField, UnitCell};
pub use primitive::{Cuboid, Cylinder, Gyroid, Parallelepiped, Primitive, Sphere};
pub use voxel::{VoxelDtype, VoxelGrid};
pub use xray_math::DVec3;
