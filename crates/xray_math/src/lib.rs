//! XRAY Math - vector types and geometry helpers shared by the renderer crates.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use camera::OrbitCamera;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;
