//! XRay Renderer - Beer-Lambert transmission projections
//!
//! Casts one ray per pixel from a camera orbiting the origin, integrates the
//! (deformed) density field along it and stores `exp(-∫ρ ds)`. Pixels of an
//! image are rendered in parallel with rayon; images are rendered in order.

mod camera;
mod context;
mod integrator;
mod output;
mod params;
mod renderer;
mod volume;

pub use camera::{focal_length, ProjectionCamera};
pub use context::RenderContext;
pub use integrator::{hierarchical, simple, IntegrationMethod, REFINEMENT};
pub use output::{
    beside_output_dir, encode_projection, format_filename, save_projection, write_object,
    FramePose, PoseManifest, Rgba16Image,
};
pub use params::{CameraAngle, RenderParams};
pub use renderer::{
    render, render_projection, render_with_context, render_with_progress, scan_half_width,
    step_size, view_schedule, ImageProgress, ProjectionImage, RenderError, RenderReport,
    RenderResult, DEFAULT_HALF_DIAGONAL,
};
pub use volume::{export_volume, sample_volume, to_bytes};

/// Re-export common math types from xray_math
pub use xray_math::{DVec3, Interval, Ray};
