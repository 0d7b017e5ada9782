//! XRay projection renderer command line.
//!
//! Every render flag is optional and overrides the matching field of the
//! base configuration, which is either the `--params` JSON file or the
//! built-in defaults.
//!
//! ```text
//! xray-render --input demos/objects/sphere.json --num_projections 36 -v
//! xray-render --params demos/params/kelvin.json --job 1 --jobs_modulo 4
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use xray_renderer::{render_with_progress, ImageProgress, RenderParams};

/// Render X-ray transmission projections of a density-field descriptor
#[derive(Parser, Debug)]
#[command(name = "xray-render")]
#[command(about = "Render X-ray projections of synthetic objects", long_about = None)]
#[command(version, allow_negative_numbers = true)]
struct Cli {
    /// JSON file with the full render configuration
    #[arg(long)]
    params: Option<PathBuf>,

    /// Object descriptor file
    #[arg(long, required_unless_present = "params")]
    input: Option<PathBuf>,

    /// Output directory to save the images [default: images]
    #[arg(long = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Number of projections to generate [default: 1]
    #[arg(long = "num_projections")]
    num_projections: Option<usize>,

    /// Resolution of the square output images [default: 512]
    #[arg(long)]
    resolution: Option<u32>,

    /// Draw random polar angles (uniform on the sphere)
    #[arg(long = "out_of_plane")]
    out_of_plane: bool,

    /// Polar angle in degrees for in-plane views [default: 90]
    #[arg(long = "polar_angle")]
    polar_angle: Option<f64>,

    /// Output file name pattern with one integer directive [default: image_%03d.png]
    #[arg(long = "fname_pattern")]
    fname_pattern: Option<String>,

    /// Fine integration step; negative infers it from the smallest feature.
    /// Hierarchical integration scans at 10*ds and refines to ds only at
    /// density edges [default: -1]
    #[arg(long)]
    ds: Option<f64>,

    /// Distance between camera and centre of scene [default: 5]
    #[arg(long = "R")]
    distance: Option<f64>,

    /// Field of view in degrees [default: 45]
    #[arg(long)]
    fov: Option<f64>,

    /// Integration method: simple or hierarchical [default: hierarchical]
    #[arg(long)]
    integration: Option<String>,

    /// Optical depth added to every ray [default: 0]
    #[arg(long = "flat_field")]
    flat_field: Option<f64>,

    /// Number of independent jobs sharing the projections [default: 1]
    #[arg(long = "jobs_modulo")]
    jobs_modulo: Option<usize>,

    /// This job's index: renders job, job + jobs_modulo, ... [default: 0]
    #[arg(long)]
    job: Option<usize>,

    /// Output file for the camera poses [default: transforms.json]
    #[arg(long = "transforms_file")]
    transforms_file: Option<PathBuf>,

    /// Multiply all densities by this number [default: 1]
    #[arg(long = "density_multiplier")]
    density_multiplier: Option<f64>,

    /// Deformation descriptor file
    #[arg(long = "deformation_file")]
    deformation_file: Option<PathBuf>,

    /// Time label written to every manifest frame [default: 0]
    #[arg(long = "time_label")]
    time_label: Option<f64>,

    /// Make fully transmitted pixels transparent
    #[arg(long)]
    transparency: bool,

    /// Also write the sampled density volume
    #[arg(long = "export_volume")]
    export_volume: bool,

    /// Override the scan half-width around the origin
    #[arg(long = "scene_half_diagonal")]
    scene_half_diagonal: Option<f64>,

    /// Seed for random polar angles
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads [default: all cores]
    #[arg(long)]
    threads: Option<usize>,

    /// Do not print a line per finished image
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    /// Resolve the final configuration and whether it came from a file.
    fn render_params(&self) -> Result<(RenderParams, bool)> {
        let (mut params, from_file) = match &self.params {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read params file '{}'", path.display()))?;
                let params = RenderParams::from_json(&content)
                    .with_context(|| format!("Invalid params file '{}'", path.display()))?;
                (params, true)
            }
            None => (RenderParams::default(), false),
        };

        fn set<T: Clone>(field: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *field = v.clone();
            }
        }

        set(&mut params.input, &self.input);
        set(&mut params.output_dir, &self.output_dir);
        set(&mut params.num_images, &self.num_projections);
        set(&mut params.resolution, &self.resolution);
        set(&mut params.polar_angle, &self.polar_angle);
        set(&mut params.fname_pattern, &self.fname_pattern);
        set(&mut params.ds, &self.ds);
        set(&mut params.distance, &self.distance);
        set(&mut params.fov, &self.fov);
        if let Some(name) = &self.integration {
            params.integration = name
                .parse()
                .with_context(|| format!("Invalid --integration '{}'", name))?;
        }
        set(&mut params.flat_field, &self.flat_field);
        set(&mut params.jobs_modulo, &self.jobs_modulo);
        set(&mut params.job_num, &self.job);
        set(&mut params.transforms_file, &self.transforms_file);
        set(&mut params.density_multiplier, &self.density_multiplier);
        set(&mut params.time_label, &self.time_label);
        if self.deformation_file.is_some() {
            params.deformation_file = self.deformation_file.clone();
        }
        if self.scene_half_diagonal.is_some() {
            params.scene_half_diagonal = self.scene_half_diagonal;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        if self.threads.is_some() {
            params.threads = self.threads;
        }
        params.out_of_plane |= self.out_of_plane;
        params.transparency |= self.transparency;
        params.export_volume |= self.export_volume;

        Ok((params, from_file))
    }
}

/// One line per finished image on stderr.
fn progress_line(progress: &ImageProgress) -> String {
    format!(
        "[{}/{}] {} (azimuthal {:.1}°, polar {:.1}°, {:.0} pix/s)",
        progress.done,
        progress.planned,
        progress.path.display(),
        progress.azimuthal,
        progress.polar,
        progress.pixels_per_second
    )
}

/// Map a configured level name onto a log filter; unknown names stay quiet.
fn level_filter(name: &str) -> log::LevelFilter {
    match name.to_ascii_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "disabled" | "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Error,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (params, from_file) = cli.render_params()?;

    let level = if cli.verbose {
        log::LevelFilter::Info
    } else if from_file {
        level_filter(&params.log_level)
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("Starting XRay projection renderer");

    let quiet = cli.quiet;
    let report = render_with_progress(&params, |progress| {
        if !quiet {
            eprintln!("{}", progress_line(progress));
        }
    })
    .with_context(|| format!("Rendering '{}' failed", params.input.display()))?;

    println!(
        "Rendered {} images to '{}' (min {:.4}, max {:.4}), poses in '{}'",
        report.num_images,
        report.output_dir.display(),
        report.min_intensity,
        report.max_intensity,
        report.transforms_file.display()
    );

    Ok(())
}
