//! Projection render loop.
//!
//! Images are rendered one after another; inside an image every pixel is an
//! independent task on the rayon pool writing only its own buffer cell.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use xray_core::{load_deformation, load_object, LoadError, Object};
use xray_math::Interval;

use crate::camera::ProjectionCamera;
use crate::context::RenderContext;
use crate::integrator::{IntegrationMethod, REFINEMENT};
use crate::output::{beside_output_dir, format_filename, save_projection, write_object, PoseManifest};
use crate::params::{CameraAngle, RenderParams};
use crate::volume::export_volume;

/// Scan half-width used when the object is unbounded: half-diagonal of the
/// [-1, 1]³ scene, rounded up.
pub const DEFAULT_HALF_DIAGONAL: f64 = 1.74;

/// Azimuthal offset of the first generated view, in degrees.
const AZIMUTH_OFFSET: f64 = 90.0;

/// Errors that can occur while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown integration method '{0}' (expected 'simple' or 'hierarchical')")]
    UnknownIntegration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot infer ds: the object has no finite feature size, set ds explicitly")]
    UnboundedStep,
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Square buffer of transmitted intensities.
///
/// Pixel `(i, j)` has `i` along camera x and `j` along camera y, both
/// starting at the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionImage {
    resolution: u32,
    pixels: Vec<f64>,
}

impl ProjectionImage {
    /// Create a new image filled with zeros.
    pub fn new(resolution: u32) -> Self {
        let n = resolution as usize * resolution as usize;
        Self {
            resolution,
            pixels: vec![0.0; n],
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    fn index(&self, i: u32, j: u32) -> usize {
        i as usize * self.resolution as usize + j as usize
    }

    pub fn get(&self, i: u32, j: u32) -> f64 {
        self.pixels[self.index(i, j)]
    }

    pub fn set(&mut self, i: u32, j: u32, value: f64) {
        let idx = self.index(i, j);
        self.pixels[idx] = value;
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 0.0);
    }

    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    /// Smallest and largest pixel value.
    pub fn min_max(&self) -> (f64, f64) {
        self.pixels
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Summary of a finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// Images rendered by this job
    pub num_images: usize,
    pub output_dir: PathBuf,
    pub transforms_file: PathBuf,
    pub min_intensity: f64,
    pub max_intensity: f64,
    pub ds: f64,
    pub scan_half_width: f64,
    pub manifest: PoseManifest,
}

/// One finished image, handed to the progress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProgress {
    /// View index in the full render
    pub index: usize,
    /// Images finished by this job, including this one
    pub done: usize,
    /// Images this job will render
    pub planned: usize,
    pub azimuthal: f64,
    pub polar: f64,
    pub pixels_per_second: f64,
    pub path: PathBuf,
}

/// Integration step for `object`: `ds` when positive, otherwise derived from
/// the smallest feature so that the first evaluated scan step is a third of it.
pub fn step_size(object: &Object, ds: f64, method: IntegrationMethod) -> RenderResult<f64> {
    if ds > 0.0 {
        return Ok(ds);
    }
    let feature = object.min_feature_size();
    if !(feature.is_finite() && feature > 0.0) {
        return Err(RenderError::UnboundedStep);
    }
    Ok(match method {
        IntegrationMethod::Simple => feature / 3.0,
        IntegrationMethod::Hierarchical => feature / (3.0 * REFINEMENT as f64),
    })
}

/// Radius around the origin that the scan window must cover.
pub fn scan_half_width(object: &Object, override_value: Option<f64>) -> f64 {
    override_value.unwrap_or_else(|| {
        object
            .bounds()
            .map(|b| b.origin_radius())
            .unwrap_or(DEFAULT_HALF_DIAGONAL)
    })
}

/// Viewing angles of every image in the full render, in index order.
///
/// Generated views are equally spaced in azimuth. Out-of-plane views draw
/// `cos(polar)` uniformly from [-1, 1], which is uniform on the sphere.
pub fn view_schedule<R: Rng>(params: &RenderParams, rng: &mut R) -> Vec<CameraAngle> {
    if !params.camera_angles.is_empty() {
        return params.camera_angles.clone();
    }

    let step = 360.0 / params.num_images as f64;
    (0..params.num_images)
        .map(|i| {
            let polar = if params.out_of_plane {
                let z: f64 = rng.gen_range(-1.0..1.0);
                z.acos().to_degrees()
            } else {
                params.polar_angle
            };
            CameraAngle {
                azimuthal: i as f64 * step + AZIMUTH_OFFSET,
                polar,
            }
        })
        .collect()
}

/// Fill `image` with the transmission of every pixel ray of `camera`.
pub fn render_projection(
    ctx: &RenderContext,
    camera: &ProjectionCamera,
    ds: f64,
    window: Interval,
    image: &mut ProjectionImage,
) {
    let res = image.resolution as usize;
    image
        .pixels
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, pixel)| {
            let i = (idx / res) as u32;
            let j = (idx % res) as u32;
            *pixel = ctx.transmission(&camera.pixel_ray(i, j), ds, window);
        });
}

/// Load the object and deformation named in `params` and render every
/// projection assigned to this job.
///
/// Same as [`render_with_progress`] with no progress reporting.
///
/// # Example
///
/// ```ignore
/// use xray_renderer::{render, RenderParams};
///
/// let mut params = RenderParams::new("demos/objects/sphere.json");
/// params.num_images = 8;
/// let report = render(&params)?;
/// println!("min {} max {}", report.min_intensity, report.max_intensity);
/// ```
pub fn render(params: &RenderParams) -> RenderResult<RenderReport> {
    render_with_progress(params, |_| {})
}

/// [`render`], calling `on_image` after each image is written.
pub fn render_with_progress<F>(params: &RenderParams, on_image: F) -> RenderResult<RenderReport>
where
    F: FnMut(&ImageProgress) + Send,
{
    let method = params.validate()?;
    log::info!("Using {} integration method", method);

    let object = load_object(&params.input)?;
    let deformation = match params.deformation_path() {
        Some(path) => Some(load_deformation(path)?),
        None => {
            log::info!("No deformation file provided");
            None
        }
    };

    let ctx = RenderContext::new(object)
        .with_deformation(deformation)
        .with_density_multiplier(params.density_multiplier)
        .with_flat_field(params.flat_field)
        .with_method(method);

    match params.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| RenderError::InvalidConfig(format!("thread pool: {}", e)))?;
            pool.install(|| render_with_context(&ctx, params, on_image))
        }
        None => render_with_context(&ctx, params, on_image),
    }
}

/// Render loop over an already built context.
pub fn render_with_context<F>(
    ctx: &RenderContext,
    params: &RenderParams,
    mut on_image: F,
) -> RenderResult<RenderReport>
where
    F: FnMut(&ImageProgress),
{
    let start = Instant::now();

    if params.output_dir.is_dir() {
        log::info!("Output to directory '{}'", params.output_dir.display());
    } else {
        log::info!("Creating output directory '{}'", params.output_dir.display());
        fs::create_dir_all(&params.output_dir)?;
    }

    let ds = step_size(&ctx.object, params.ds, ctx.method)?;
    if params.ds < 0.0 {
        log::info!("Setting ds to {}", ds);
    }
    let half_width = scan_half_width(&ctx.object, params.scene_half_diagonal);

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let views = view_schedule(params, &mut rng);
    let total = views.len();
    let indices: Vec<usize> = (params.job_num..total).step_by(params.jobs_modulo).collect();

    log::info!(
        "Generating {} images at resolution {}, every {} starting from {}",
        total,
        params.resolution,
        params.jobs_modulo,
        params.job_num
    );

    let mut image = ProjectionImage::new(params.resolution);
    let mut manifest = PoseManifest::new(params.fov, params.resolution);
    let (mut min_val, mut max_val) = (1.0_f64, 0.0_f64);
    let mut rendered = 0;

    for &index in &indices {
        let view = views[index];
        let camera = ProjectionCamera::new(
            view.azimuthal,
            view.polar,
            params.distance,
            params.fov,
            params.resolution,
        );
        let window = camera.scan_window(half_width);

        let t0 = Instant::now();
        image.clear();
        render_projection(ctx, &camera, ds, window, &mut image);

        let (lo, hi) = image.min_max();
        min_val = min_val.min(lo);
        max_val = max_val.max(hi);

        let pixels_per_second = image.pixels().len() as f64 / t0.elapsed().as_secs_f64().max(1e-9);
        log::info!(
            "Image {}/{} (azimuthal {:.1}°, polar {:.1}°): {:.0} pix/s",
            index + 1,
            total,
            view.azimuthal,
            view.polar,
            pixels_per_second
        );
        if index == 0 || index + 1 == total {
            log::info!("Min value: {}, Max value: {}", min_val, max_val);
        }

        let path = params
            .output_dir
            .join(format_filename(&params.fname_pattern, index)?);
        save_projection(&path, &image, params.transparency)?;
        manifest.push(&path, &camera, params.time_label);
        rendered += 1;

        on_image(&ImageProgress {
            index,
            done: rendered,
            planned: indices.len(),
            azimuthal: view.azimuthal,
            polar: view.polar,
            pixels_per_second,
            path,
        });
    }

    manifest.write(&params.transforms_file)?;
    write_object(&beside_output_dir(&params.output_dir, "object.json"), &ctx.object)?;

    if params.export_volume {
        export_volume(
            ctx,
            params.resolution as usize,
            &beside_output_dir(&params.output_dir, "volume.raw"),
        )?;
    }

    log::info!("Elapsed time: {:.2?}", start.elapsed());

    Ok(RenderReport {
        num_images: rendered,
        output_dir: params.output_dir.clone(),
        transforms_file: params.transforms_file.clone(),
        min_intensity: min_val,
        max_intensity: max_val,
        ds,
        scan_half_width: half_width,
        manifest,
    })
}
