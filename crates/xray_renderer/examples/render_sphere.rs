//! Render a few projections of a sphere inside a tessellated lattice.
//!
//! Run with: cargo run --release --example render_sphere

use std::fs;

use xray_core::{load_object_from_str, Object, TessellatedField, UnitCell};
use xray_math::{Aabb, DVec3};
use xray_renderer::{
    render_projection, save_projection, IntegrationMethod, PoseManifest, ProjectionCamera,
    ProjectionImage, RenderContext,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("XRay Projection Renderer - Sphere Example");
    println!("==========================================");

    let start = std::time::Instant::now();
    let object = build_object()?;
    println!("Object: {}", object);
    println!("Built in {:?}", start.elapsed());

    let ctx = RenderContext::new(object).with_method(IntegrationMethod::Hierarchical);

    let resolution = 256;
    let fov = 45.0;
    let ds = 0.002;
    let output_dir = std::path::Path::new("output");
    fs::create_dir_all(output_dir)?;

    let mut image = ProjectionImage::new(resolution);
    let mut manifest = PoseManifest::new(fov, resolution);

    for (i, azimuthal) in [90.0, 135.0, 180.0].iter().enumerate() {
        let camera = ProjectionCamera::new(*azimuthal, 70.0, 5.0, fov, resolution);

        let start = std::time::Instant::now();
        image.clear();
        render_projection(&ctx, &camera, ds, camera.scan_window(1.74), &mut image);
        let (lo, hi) = image.min_max();
        println!(
            "View {} rendered in {:?} (min {:.3}, max {:.3})",
            i,
            start.elapsed(),
            lo,
            hi
        );

        let path = output_dir.join(format!("sphere_{:02}.png", i));
        save_projection(&path, &image, false)?;
        manifest.push(&path, &camera, 0.0);
    }

    manifest.write(output_dir.join("transforms.json"))?;
    println!("Saved {} views to {}", manifest.frames.len(), output_dir.display());
    Ok(())
}

fn build_object() -> Result<Object, Box<dyn std::error::Error>> {
    let sphere = load_object_from_str(
        r#"{"type": "sphere", "center": [0, 0, 0], "radius": 0.6, "rho": 2.0}"#,
        None,
    )?;

    let lattice = TessellatedField::new(
        UnitCell::kelvin(0.03, 0.5)?,
        Aabb::from_points(DVec3::splat(-1.0), DVec3::splat(1.0)),
    );

    let objects = vec![sphere, Object::Tessellated(lattice)];
    Ok(Object::Composite(xray_core::Composite::new(objects, false)?))
}
