//! Dense sampling of the deformed density on a cubic grid.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use xray_core::DensityField;
use xray_math::DVec3;

use crate::renderer::RenderResult;

/// Sample `field` on a `res³` grid over [-1, 1)³.
///
/// Sample `(i, j, k)` sits at `(i, j, k) / res · 2 - 1` and is stored at
/// `k·res² + i·res + j`.
pub fn sample_volume<F: DensityField + ?Sized>(field: &F, res: usize) -> Vec<f64> {
    let n = res * res * res;
    let scale = 2.0 / res as f64;

    (0..n)
        .into_par_iter()
        .map(|idx| {
            let k = idx / (res * res);
            let i = (idx / res) % res;
            let j = idx % res;
            let p = DVec3::new(i as f64, j as f64, k as f64) * scale - DVec3::ONE;
            field.density(p)
        })
        .collect()
}

/// Normalise samples by their maximum to the full byte range.
///
/// An all-zero volume stays zero.
pub fn to_bytes(samples: &[f64]) -> Vec<u8> {
    let max = samples.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0; samples.len()];
    }
    samples
        .iter()
        .map(|&v| (v / max * 255.0) as u8)
        .collect()
}

/// Sample, normalise and write a raw `u8` volume.
pub fn export_volume<F: DensityField + ?Sized>(field: &F, res: usize, path: &Path) -> RenderResult<()> {
    log::info!("Assembling {}³ volume grid", res);
    let bytes = to_bytes(&sample_volume(field, res));

    log::info!("Writing volume to '{}'", path.display());
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XRamp;

    impl DensityField for XRamp {
        fn density(&self, p: DVec3) -> f64 {
            p.x + 1.0
        }
    }

    struct HalfSpace;

    impl DensityField for HalfSpace {
        fn density(&self, p: DVec3) -> f64 {
            if p.z >= 0.0 {
                2.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_layout() {
        let res = 4;
        let samples = sample_volume(&XRamp, res);
        assert_eq!(samples.len(), 64);
        // i is the middle index: x = i/2 - 1, so density = i/2
        for k in 0..res {
            for i in 0..res {
                for j in 0..res {
                    let v = samples[k * res * res + i * res + j];
                    assert!((v - i as f64 * 0.5).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_z_is_slowest() {
        let res = 2;
        let bytes = to_bytes(&sample_volume(&HalfSpace, res));
        // k = 0 -> z = -1, k = 1 -> z = 0
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_all_zero_volume() {
        assert_eq!(to_bytes(&[0.0, 0.0]), vec![0, 0]);
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volume.raw");
        export_volume(&HalfSpace, 3, &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 27);
    }
}
