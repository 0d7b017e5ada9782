//! Files written by a render: projection PNGs, the pose manifest and the
//! serialized object.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageFormat, Rgba};
use serde::{Deserialize, Serialize};
use xray_core::Object;
use xray_math::Mat4Ext;

use crate::camera::ProjectionCamera;
use crate::renderer::{ProjectionImage, RenderError, RenderResult};

/// 16-bit RGBA image as written to disk.
pub type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Pose record of a single projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePose {
    /// `<output dir name>/<file name>`, forward slashes
    pub file_path: String,
    pub time: f64,
    /// Camera-to-world matrix, row-major
    pub transform_matrix: [[f64; 4]; 4],
}

/// Camera intrinsics shared by all projections plus one pose per image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseManifest {
    /// Full field of view in radians
    pub camera_angle_x: f64,
    pub fl_x: f64,
    pub fl_y: f64,
    pub w: u32,
    pub h: u32,
    pub cx: f64,
    pub cy: f64,
    pub frames: Vec<FramePose>,
}

impl PoseManifest {
    /// Empty manifest with intrinsics for `fov` (degrees) and `resolution`.
    pub fn new(fov: f64, resolution: u32) -> Self {
        let fl = crate::camera::focal_length(fov) * resolution as f64 / 2.0;
        let c = resolution as f64 / 2.0;
        Self {
            camera_angle_x: fov.to_radians(),
            fl_x: fl,
            fl_y: fl,
            w: resolution,
            h: resolution,
            cx: c,
            cy: c,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, image_path: &Path, camera: &ProjectionCamera, time: f64) {
        self.frames.push(FramePose {
            file_path: manifest_path(image_path),
            time,
            transform_matrix: camera.camera_to_world().to_rows(),
        });
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> RenderResult<()> {
        let path = path.as_ref();
        log::info!("Writing transform parameters to '{}'", path.display());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Path of an image relative to the parent of its output directory.
fn manifest_path(image_path: &Path) -> String {
    let file = image_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = image_path
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().into_owned());
    match dir {
        Some(dir) => format!("{}/{}", dir, file),
        None => file,
    }
}

/// Expand the first printf-style integer directive (`%d`, `%3d`, `%03d`)
/// in `pattern` with `index`. `%%` is a literal percent sign.
pub fn format_filename(pattern: &str, index: usize) -> RenderResult<String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut expanded = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let zero_pad = chars.peek() == Some(&'0');
        if zero_pad {
            chars.next();
        }
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width * 10 + d as usize;
            chars.next();
        }
        if chars.next() != Some('d') || expanded {
            return Err(RenderError::InvalidConfig(format!(
                "fname_pattern '{}' must contain exactly one integer directive such as %03d",
                pattern
            )));
        }
        if zero_pad {
            out.push_str(&format!("{:0width$}", index, width = width));
        } else {
            out.push_str(&format!("{:width$}", index, width = width));
        }
        expanded = true;
    }

    if !expanded {
        return Err(RenderError::InvalidConfig(format!(
            "fname_pattern '{}' has no integer directive",
            pattern
        )));
    }
    Ok(out)
}

/// Convert an intensity image to 16-bit grayscale RGBA.
///
/// Pixel `(i, j)` lands at column `i`, row `res - 1 - j` so that camera +y
/// points up in the file. With `transparency`, fully transmitted pixels get
/// zero alpha.
pub fn encode_projection(image: &ProjectionImage, transparency: bool) -> Rgba16Image {
    let res = image.resolution();
    Rgba16Image::from_fn(res, res, |col, row| {
        let value = image.get(col, res - 1 - row);
        let level = (value.clamp(0.0, 1.0) * u16::MAX as f64) as u16;
        let alpha = if transparency && value >= 1.0 {
            0
        } else {
            u16::MAX
        };
        Rgba([level, level, level, alpha])
    })
}

/// Encode and save one projection as a PNG.
pub fn save_projection(path: &Path, image: &ProjectionImage, transparency: bool) -> RenderResult<()> {
    log::debug!("Saving image to '{}'", path.display());
    encode_projection(image, transparency).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Sibling of the output directory, e.g. `renders/images` -> `renders/<name>`.
pub fn beside_output_dir(output_dir: &Path, name: &str) -> PathBuf {
    match output_dir.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Write the object's descriptor as pretty JSON.
pub fn write_object(path: &Path, object: &Object) -> RenderResult<()> {
    log::info!("Writing object to '{}'", path.display());
    let json = serde_json::to_string_pretty(&object.to_descriptor())?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_filename() {
        assert_eq!(format_filename("image_%03d.png", 7).unwrap(), "image_007.png");
        assert_eq!(format_filename("image_%d.png", 42).unwrap(), "image_42.png");
        assert_eq!(format_filename("img%3d.png", 5).unwrap(), "img  5.png");
        assert_eq!(format_filename("%%_%02d", 1234).unwrap(), "%_1234");
    }

    #[test]
    fn test_format_filename_rejects_bad_patterns() {
        assert!(format_filename("image.png", 0).is_err());
        assert!(format_filename("image_%s.png", 0).is_err());
        assert!(format_filename("%d_%d.png", 0).is_err());
    }

    #[test]
    fn test_encode_flips_rows() {
        let mut image = ProjectionImage::new(2);
        image.set(0, 0, 0.25);
        image.set(1, 1, 1.0);

        let encoded = encode_projection(&image, false);
        // (0, 0) is bottom-left in camera space
        let bottom_left = encoded.get_pixel(0, 1);
        assert_eq!(bottom_left.0[0], (0.25 * 65535.0) as u16);
        assert_eq!(encoded.get_pixel(1, 0).0, [u16::MAX; 4]);
        assert_eq!(encoded.get_pixel(0, 0).0, [0, 0, 0, u16::MAX]);
    }

    #[test]
    fn test_transparency_masks_background() {
        let mut image = ProjectionImage::new(2);
        image.set(0, 0, 1.0);
        image.set(1, 0, 0.5);

        let encoded = encode_projection(&image, true);
        assert_eq!(encoded.get_pixel(0, 1).0[3], 0);
        assert_eq!(encoded.get_pixel(1, 1).0[3], u16::MAX);
    }

    #[test]
    fn test_save_projection_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_000.png");
        let mut image = ProjectionImage::new(4);
        image.set(2, 3, 0.5);

        save_projection(&path, &image, false).unwrap();

        let loaded = image::open(&path).unwrap().into_rgba16();
        assert_eq!(loaded.dimensions(), (4, 4));
        assert_eq!(loaded.get_pixel(2, 0).0[0], (0.5 * 65535.0) as u16);
    }

    #[test]
    fn test_manifest_json() {
        let camera = ProjectionCamera::new(90.0, 90.0, 5.0, 45.0, 128);
        let mut manifest = PoseManifest::new(45.0, 128);
        manifest.push(Path::new("out/images/image_000.png"), &camera, 0.5);

        assert_eq!(manifest.frames[0].file_path, "images/image_000.png");
        assert!((manifest.fl_x - camera.focal_length_px()).abs() < 1e-12);

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["w"], 128);
        assert_eq!(value["cx"], 64.0);
        assert_eq!(value["frames"][0]["time"], 0.5);
        // Translation column of the row-major matrix holds the eye
        let row0 = &value["frames"][0]["transform_matrix"][0];
        assert!(row0[3].as_f64().unwrap().abs() < 1e-9);
        let row1 = &value["frames"][0]["transform_matrix"][1];
        assert!((row1[3].as_f64().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_beside_output_dir() {
        assert_eq!(
            beside_output_dir(Path::new("renders/images"), "object.json"),
            PathBuf::from("renders/object.json")
        );
        assert_eq!(
            beside_output_dir(Path::new("images"), "object.json"),
            PathBuf::from("object.json")
        );
    }
}
