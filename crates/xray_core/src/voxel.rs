//! Voxel grid density and raw volume loading.
//!
//! A voxel grid covers the cube [-1, 1]³. Samples are stored x-fastest
//! (`index = z·NX·NY + y·NX + x`) and interpolated trilinearly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xray_math::{Aabb, DVec3};

use crate::loader::{LoadError, LoadResult};

/// Sample encoding of a raw volume file. All multi-byte types are little endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoxelDtype {
    #[default]
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl VoxelDtype {
    /// Size of one sample in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            VoxelDtype::Uint8 => 1,
            VoxelDtype::Uint16 => 2,
            VoxelDtype::Uint32 | VoxelDtype::Float32 => 4,
            VoxelDtype::Float64 => 8,
        }
    }

    /// Decode raw bytes into densities.
    ///
    /// Integer types are normalised to [0, 1]; floats pass through.
    pub fn decode(self, bytes: &[u8]) -> Vec<f64> {
        match self {
            VoxelDtype::Uint8 => bytes.iter().map(|&b| b as f64 / u8::MAX as f64).collect(),
            VoxelDtype::Uint16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f64 / u16::MAX as f64)
                .collect(),
            VoxelDtype::Uint32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64 / u32::MAX as f64)
                .collect(),
            VoxelDtype::Float32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            VoxelDtype::Float64 => bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        }
    }
}

/// `nx·ny·nz`, or an error when it does not fit in memory addressing.
fn sample_count(resolution: [usize; 3]) -> LoadResult<usize> {
    resolution
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| too_large(resolution))
}

fn too_large(resolution: [usize; 3]) -> LoadError {
    LoadError::invalid(
        "resolution",
        format!("{:?} holds more samples than can be addressed", resolution),
    )
}

/// Trilinearly interpolated density samples on [-1, 1]³.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    nx: usize,
    ny: usize,
    nz: usize,
    rho: Vec<f64>,
    /// File the samples came from, as written in the descriptor
    source: Option<(PathBuf, VoxelDtype)>,
}

impl VoxelGrid {
    /// Create a grid from in-memory samples.
    pub fn new(resolution: [usize; 3], rho: Vec<f64>) -> LoadResult<Self> {
        let [nx, ny, nz] = resolution;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(LoadError::invalid(
                "resolution",
                format!("every axis needs at least one sample, got {:?}", resolution),
            ));
        }
        let expected = sample_count(resolution)?;
        if rho.len() != expected {
            return Err(LoadError::invalid(
                "rho",
                format!("expected {} samples, got {}", expected, rho.len()),
            ));
        }
        if let Some(bad) = rho.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(LoadError::invalid(
                "rho",
                format!("samples must be finite and non-negative, found {}", bad),
            ));
        }
        Ok(Self {
            nx,
            ny,
            nz,
            rho,
            source: None,
        })
    }

    /// Load a grid from a raw file.
    ///
    /// `path` is kept as given for serialization; `resolved` is where the
    /// bytes are actually read from.
    pub fn from_raw(
        path: &Path,
        resolved: &Path,
        resolution: [usize; 3],
        dtype: VoxelDtype,
    ) -> LoadResult<Self> {
        let is_raw = resolved
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("raw"))
            .unwrap_or(false);
        if !is_raw {
            return Err(LoadError::UnsupportedVoxelFile(path.to_path_buf()));
        }

        let bytes = fs::read(resolved).map_err(|source| LoadError::File {
            path: resolved.to_path_buf(),
            source,
        })?;
        let expected = sample_count(resolution)?
            .checked_mul(dtype.bytes_per_sample())
            .ok_or_else(|| too_large(resolution))?;
        if bytes.len() != expected {
            return Err(LoadError::VoxelSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let mut grid = Self::new(resolution, dtype.decode(&bytes))?;
        grid.source = Some((path.to_path_buf(), dtype));

        log::debug!(
            "Loaded voxel grid: {} ({}x{}x{} {:?})",
            path.display(),
            grid.nx,
            grid.ny,
            grid.nz,
            dtype
        );
        Ok(grid)
    }

    /// Samples along x, y, z.
    pub fn resolution(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Raw samples, x fastest.
    pub fn samples(&self) -> &[f64] {
        &self.rho
    }

    /// The raw file this grid was read from, if any.
    pub fn source(&self) -> Option<(&Path, VoxelDtype)> {
        self.source.as_ref().map(|(p, d)| (p.as_path(), *d))
    }

    #[inline]
    fn at(&self, x: usize, y: usize, z: usize) -> f64 {
        self.rho[z * self.nx * self.ny + y * self.nx + x]
    }

    pub fn density(&self, p: DVec3) -> f64 {
        if !Self::bounds().contains(p) {
            return 0.0;
        }

        // [-1, 1] -> voxel index space
        let x = (p.x + 1.0) / 2.0 * (self.nx - 1) as f64;
        let y = (p.y + 1.0) / 2.0 * (self.ny - 1) as f64;
        let z = (p.z + 1.0) / 2.0 * (self.nz - 1) as f64;

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let z0 = z.floor() as usize;
        let x1 = (x0 + 1).min(self.nx - 1);
        let y1 = (y0 + 1).min(self.ny - 1);
        let z1 = (z0 + 1).min(self.nz - 1);

        let wx = x - x0 as f64;
        let wy = y - y0 as f64;
        let wz = z - z0 as f64;

        let c00 = self.at(x0, y0, z0) * (1.0 - wz) + self.at(x0, y0, z1) * wz;
        let c01 = self.at(x0, y1, z0) * (1.0 - wz) + self.at(x0, y1, z1) * wz;
        let c10 = self.at(x1, y0, z0) * (1.0 - wz) + self.at(x1, y0, z1) * wz;
        let c11 = self.at(x1, y1, z0) * (1.0 - wz) + self.at(x1, y1, z1) * wz;
        let c0 = c00 * (1.0 - wy) + c01 * wy;
        let c1 = c10 * (1.0 - wy) + c11 * wy;
        c0 * (1.0 - wx) + c1 * wx
    }

    /// One voxel in normalised coordinates.
    pub fn min_feature_size(&self) -> f64 {
        2.0 / self.nx.max(self.ny).max(self.nz) as f64
    }

    /// The grid always spans [-1, 1]³.
    pub fn bounds() -> Aabb {
        Aabb::from_points(DVec3::splat(-1.0), DVec3::splat(1.0))
    }
}
