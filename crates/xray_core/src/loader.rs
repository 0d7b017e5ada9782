//! Descriptor loading.
//!
//! This module is the boundary between JSON or YAML documents and the typed
//! entity tree. Decoding failures, precondition violations and I/O problems all
//! surface here as [`LoadError`]; nothing past this point can fail.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::deformation::Deformation;
use crate::descriptor::ObjectDesc;
use crate::object::Object;

/// Errors that can occur while loading objects and deformations.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Malformed YAML descriptor: {0}")]
    YamlDescriptor(#[from] serde_yaml::Error),

    #[error("Invalid value for `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Voxel file holds {actual} bytes, expected {expected}")]
    VoxelSizeMismatch { expected: usize, actual: usize },

    #[error("Unsupported voxel file `{0}` (only .raw is supported)")]
    UnsupportedVoxelFile(PathBuf),

    #[error("Object collection has no members")]
    EmptyCollection,

    #[error("Unit cell `objects` must be an object_collection, got `{0}`")]
    UnitCellObjects(&'static str),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

impl LoadError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        LoadError::InvalidField {
            field,
            message: message.into(),
        }
    }
}

/// Require a finite value strictly greater than zero.
pub(crate) fn positive(field: &'static str, value: f64) -> LoadResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LoadError::invalid(field, format!("must be positive, got {}", value)))
    }
}

/// Require a finite, non-negative value.
pub(crate) fn non_negative(field: &'static str, value: f64) -> LoadResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(LoadError::invalid(field, format!("must be non-negative, got {}", value)))
    }
}

/// Require a finite value.
pub(crate) fn finite(field: &'static str, value: f64) -> LoadResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoadError::invalid(field, format!("must be finite, got {}", value)))
    }
}

/// Document syntax of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorFormat {
    #[default]
    Json,
    Yaml,
}

impl DescriptorFormat {
    /// `.yaml` and `.yml` files are YAML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DescriptorFormat::Yaml
            }
            _ => DescriptorFormat::Json,
        }
    }

    fn decode<T: DeserializeOwned>(self, content: &str) -> LoadResult<T> {
        Ok(match self {
            DescriptorFormat::Json => serde_json::from_str(content)?,
            DescriptorFormat::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Build an object from a document in this format.
    pub fn parse_object(self, content: &str, base_dir: Option<&Path>) -> LoadResult<Object> {
        let desc: ObjectDesc = self.decode(content)?;
        Object::from_descriptor(&desc, base_dir)
    }

    /// Build a validated deformation from a document in this format.
    pub fn parse_deformation(self, content: &str) -> LoadResult<Deformation> {
        let deformation: Deformation = self.decode(content)?;
        deformation.validate()?;
        Ok(deformation)
    }
}

fn read_file(path: &Path) -> LoadResult<String> {
    fs::read_to_string(path).map_err(|source| LoadError::File {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an object descriptor file and build the density field.
///
/// The format follows the file extension (see [`DescriptorFormat::from_path`]).
/// Relative voxel-grid paths are resolved against the descriptor's directory.
///
/// # Example
///
/// ```ignore
/// use xray_core::load_object;
///
/// let object = load_object("demos/objects/kelvin_lattice.json")?;
/// println!("Smallest feature: {}", object.min_feature_size());
/// ```
pub fn load_object<P: AsRef<Path>>(path: P) -> LoadResult<Object> {
    let path = path.as_ref();
    log::info!("Loading object from '{}'", path.display());

    let content = read_file(path)?;
    let object = DescriptorFormat::from_path(path).parse_object(&content, path.parent())?;

    log::info!("Loaded object: {}", object);
    Ok(object)
}

/// Build an object from a JSON string.
pub fn load_object_from_str(content: &str, base_dir: Option<&Path>) -> LoadResult<Object> {
    DescriptorFormat::Json.parse_object(content, base_dir)
}

/// Load a deformation descriptor file.
pub fn load_deformation<P: AsRef<Path>>(path: P) -> LoadResult<Deformation> {
    let path = path.as_ref();
    log::info!("Loading deformation from '{}'", path.display());

    let content = read_file(path)?;
    let deformation = DescriptorFormat::from_path(path).parse_deformation(&content)?;

    log::info!("Deformation: {:?}", deformation);
    Ok(deformation)
}

/// Build a deformation from a JSON string.
pub fn load_deformation_from_str(content: &str) -> LoadResult<Deformation> {
    DescriptorFormat::Json.parse_deformation(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use xray_math::DVec3;

    #[test]
    fn test_load_sphere_from_str() {
        let object = load_object_from_str(
            r#"{"type": "sphere", "center": [0, 0, 0], "radius": 0.5, "rho": 1}"#,
            None,
        )
        .unwrap();

        assert_eq!(object.density(DVec3::ZERO), 1.0);
        assert_eq!(object.density(DVec3::new(0.6, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = load_object_from_str(r#"{"type": "torus", "radius": 1.0}"#, None).unwrap_err();
        assert!(matches!(err, LoadError::Descriptor(_)));
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let err = load_object_from_str(r#"{"center": [0, 0, 0], "radius": 1.0, "rho": 1.0}"#, None)
            .unwrap_err();
        assert!(matches!(err, LoadError::Descriptor(_)));
    }

    #[test]
    fn test_mistyped_field_is_rejected() {
        let err = load_object_from_str(
            r#"{"type": "sphere", "center": [0, 0, 0], "radius": "big", "rho": 1.0}"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Descriptor(_)));
    }

    #[test]
    fn test_nested_error_aborts_whole_tree() {
        let err = load_object_from_str(
            r#"{
                "type": "object_collection",
                "objects": [
                    {"type": "sphere", "center": [0, 0, 0], "radius": 0.5, "rho": 1.0},
                    {"type": "cylinder", "p0": [0, 0, 0], "p1": [0, 0, 0], "radius": 0.1}
                ]
            }"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidField { field: "p1", .. }));
    }

    #[test]
    fn test_load_object_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "box", "center": [0, 0, 0], "sides": [1, 2, 3], "rho": 0.5}}"#
        )
        .unwrap();

        let object = load_object(file.path()).unwrap();
        assert_eq!(object.density(DVec3::new(0.4, 0.9, 1.4)), 0.5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_object("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::File { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DescriptorFormat::from_path(Path::new("a.yaml")), DescriptorFormat::Yaml);
        assert_eq!(DescriptorFormat::from_path(Path::new("a.YML")), DescriptorFormat::Yaml);
        assert_eq!(DescriptorFormat::from_path(Path::new("a.json")), DescriptorFormat::Json);
        assert_eq!(DescriptorFormat::from_path(Path::new("noext")), DescriptorFormat::Json);
    }

    #[test]
    fn test_load_yaml_object_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "type: object_collection\n\
             greedy_dens_eval: false\n\
             objects:\n\
             \x20 - type: sphere\n\
             \x20   center: [0, 0, 0]\n\
             \x20   radius: 0.5\n\
             \x20   rho: 0.25\n\
             \x20 - type: cube\n\
             \x20   center: [0, 0, 0]\n\
             \x20   side: 0.2\n\
             \x20   rho: 0.5\n"
        )
        .unwrap();

        let object = load_object(file.path()).unwrap();
        assert_eq!(object.density(DVec3::ZERO), 0.75);
        assert_eq!(object.density(DVec3::new(0.3, 0.0, 0.0)), 0.25);
    }

    #[test]
    fn test_load_yaml_deformation_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(
            file,
            "type: sigmoid\namplitude: 0.5\ncenter: 0.0\nlengthscale: 0.1\ndirection: z\n"
        )
        .unwrap();

        let deformation = load_deformation(file.path()).unwrap();
        let moved = deformation.apply(DVec3::ZERO);
        assert!((moved.z - 0.25).abs() < 1e-12);
        assert_eq!(moved.x, 0.0);
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let err = DescriptorFormat::Yaml
            .parse_object("type: torus\nradius: 1.0\n", None)
            .unwrap_err();
        assert!(matches!(err, LoadError::YamlDescriptor(_)));
    }

    #[test]
    fn test_load_deformation_from_str() {
        let deformation = load_deformation_from_str(
            r#"{"type": "rigid", "displacements": [1.0, 0.0, 0.0]}"#,
        )
        .unwrap();
        assert_eq!(deformation.apply(DVec3::ZERO), DVec3::X);
    }

    #[test]
    fn test_unknown_deformation_is_rejected() {
        let err = load_deformation_from_str(r#"{"type": "twist", "angle": 1.0}"#).unwrap_err();
        assert!(matches!(err, LoadError::Descriptor(_)));
    }

    #[test]
    fn test_degenerate_deformation_is_rejected() {
        let err = load_deformation_from_str(
            r#"{"type": "sigmoid", "amplitude": 0.1, "center": 0.0, "lengthscale": 0.0, "direction": "x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidField { field: "lengthscale", .. }));
    }
}
