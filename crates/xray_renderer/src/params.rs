//! Render configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::integrator::IntegrationMethod;
use crate::output::format_filename;
use crate::renderer::{RenderError, RenderResult};

/// Explicit viewing direction, both angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraAngle {
    /// Measured from +X towards +Y
    pub azimuthal: f64,
    /// Measured from +Z; 90 is the equatorial plane
    pub polar: f64,
}

/// Fully resolved render configuration.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes (usually just `input`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Object descriptor file
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// printf-style pattern with one integer directive, e.g. `image_%03d.png`
    pub fname_pattern: String,
    /// Width and height of the square projections
    pub resolution: u32,
    pub num_images: usize,
    /// Draw the polar angle uniformly on the sphere instead of using `polar_angle`
    pub out_of_plane: bool,
    /// Polar angle in degrees for in-plane views
    pub polar_angle: f64,
    /// Explicit view list; overrides `num_images` and angle generation
    pub camera_angles: Vec<CameraAngle>,
    /// Fine integration step; negative infers it from the object.
    /// The hierarchical method scans at `REFINEMENT·ds` and only drops to
    /// `ds` around density edges.
    pub ds: f64,
    /// Camera distance from the origin
    #[serde(rename = "R")]
    pub distance: f64,
    /// Field of view in degrees
    pub fov: f64,
    pub jobs_modulo: usize,
    pub job_num: usize,
    pub transforms_file: PathBuf,
    pub deformation_file: Option<PathBuf>,
    /// Copied into every manifest frame
    pub time_label: f64,
    pub transparency: bool,
    pub export_volume: bool,
    pub density_multiplier: f64,
    pub flat_field: f64,
    /// `simple` or `hierarchical`
    pub integration: IntegrationMethod,
    /// Overrides the scan half-width derived from the object bounds
    pub scene_half_diagonal: Option<f64>,
    /// Seed for out-of-plane polar angles
    pub seed: Option<u64>,
    /// Worker threads; the global rayon pool when unset
    pub threads: Option<usize>,
    pub log_level: String,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("images"),
            fname_pattern: "image_%03d.png".to_string(),
            resolution: 512,
            num_images: 1,
            out_of_plane: false,
            polar_angle: 90.0,
            camera_angles: Vec::new(),
            ds: -1.0,
            distance: 5.0,
            fov: 45.0,
            jobs_modulo: 1,
            job_num: 0,
            transforms_file: PathBuf::from("transforms.json"),
            deformation_file: None,
            time_label: 0.0,
            transparency: false,
            export_volume: false,
            density_multiplier: 1.0,
            flat_field: 0.0,
            integration: IntegrationMethod::default(),
            scene_half_diagonal: None,
            seed: None,
            threads: None,
            log_level: "error".to_string(),
        }
    }
}

impl RenderParams {
    /// Parameters for `input` with everything else at its default.
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Read parameters from a JSON document.
    pub fn from_json(content: &str) -> RenderResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Number of views in the full (unsharded) render.
    pub fn total_images(&self) -> usize {
        if self.camera_angles.is_empty() {
            self.num_images
        } else {
            self.camera_angles.len()
        }
    }

    /// Deformation file, treating an empty path as none.
    pub fn deformation_path(&self) -> Option<&Path> {
        self.deformation_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Check everything that does not need the object, returning the
    /// integration method to use.
    pub fn validate(&self) -> RenderResult<IntegrationMethod> {
        let method = self.integration;

        if self.resolution == 0 {
            return Err(invalid("resolution must be at least 1"));
        }
        if self.total_images() == 0 {
            return Err(invalid("nothing to render: num_images is 0"));
        }
        if self.jobs_modulo == 0 {
            return Err(invalid("jobs_modulo must be at least 1"));
        }
        if self.job_num >= self.jobs_modulo {
            return Err(invalid(format!(
                "job_num {} must be below jobs_modulo {}",
                self.job_num, self.jobs_modulo
            )));
        }
        if self.ds == 0.0 || !self.ds.is_finite() {
            return Err(invalid(format!(
                "ds must be positive, or negative to infer it (got {})",
                self.ds
            )));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(invalid(format!("R must be positive (got {})", self.distance)));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(invalid(format!("fov must be in (0, 180) degrees (got {})", self.fov)));
        }
        if let Some(k) = self.scene_half_diagonal {
            if !(k.is_finite() && k > 0.0) {
                return Err(invalid(format!("scene_half_diagonal must be positive (got {})", k)));
            }
        }
        if self.threads == Some(0) {
            return Err(invalid("threads must be at least 1"));
        }
        format_filename(&self.fname_pattern, 0)?;

        Ok(method)
    }
}

fn invalid(message: impl Into<String>) -> RenderError {
    RenderError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let params = RenderParams::from_json(r#"{"input": "sphere.json"}"#).unwrap();
        assert_eq!(params.input, PathBuf::from("sphere.json"));
        assert_eq!(params.resolution, 512);
        assert_eq!(params.distance, 5.0);
        assert_eq!(params.fname_pattern, "image_%03d.png");
        assert_eq!(params.validate().unwrap(), IntegrationMethod::Hierarchical);
    }

    #[test]
    fn test_r_key_and_angles() {
        let params = RenderParams::from_json(
            r#"{
                "input": "a.json",
                "R": 3.5,
                "integration": "simple",
                "camera_angles": [{"azimuthal": 10, "polar": 80}, {"azimuthal": 20, "polar": 90}]
            }"#,
        )
        .unwrap();
        assert_eq!(params.distance, 3.5);
        assert_eq!(params.total_images(), 2);
        assert_eq!(params.validate().unwrap(), IntegrationMethod::Simple);
    }

    #[test]
    fn test_validation_failures() {
        let base = RenderParams::new("a.json");

        let mut p = base.clone();
        p.jobs_modulo = 2;
        p.job_num = 2;
        assert!(matches!(p.validate(), Err(RenderError::InvalidConfig(_))));

        let mut p = base.clone();
        p.resolution = 0;
        assert!(p.validate().is_err());

        let mut p = base.clone();
        p.ds = 0.0;
        assert!(p.validate().is_err());

        let mut p = base;
        p.fname_pattern = "image.png".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_unknown_integration_in_json() {
        let err = RenderParams::from_json(r#"{"input": "a.json", "integration": "midpoint"}"#)
            .unwrap_err();
        assert!(matches!(err, RenderError::Json(_)));

        let params = RenderParams::new("a.json");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["integration"], "hierarchical");
    }

    #[test]
    fn test_empty_deformation_path_is_none() {
        let mut params = RenderParams::new("a.json");
        params.deformation_file = Some(PathBuf::new());
        assert!(params.deformation_path().is_none());
        params.deformation_file = Some(PathBuf::from("d.json"));
        assert_eq!(params.deformation_path(), Some(Path::new("d.json")));
    }
}
