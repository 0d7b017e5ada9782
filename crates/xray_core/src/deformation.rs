//! Coordinate warps applied before density evaluation.
//!
//! A deformation maps a sample point to the point at which the undeformed
//! field is looked up: `density(p) = field(deformation.apply(p))`.

use serde::{Deserialize, Serialize};
use xray_math::{DMat3, DVec3};

use crate::loader::{finite, positive, LoadError, LoadResult};

/// Coordinate axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A pure point-to-point remap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Deformation {
    /// Constant translation.
    Rigid { displacements: DVec3 },
    /// Symmetric small-strain tensor, components ordered xx, yy, zz, yz, xz, xy.
    Linear { strains: [f64; 6] },
    /// Smooth step added to one coordinate.
    Sigmoid {
        amplitude: f64,
        center: f64,
        lengthscale: f64,
        direction: Axis,
    },
    /// Radial bump around `centers`, scaled independently per axis.
    Gaussian {
        amplitudes: DVec3,
        sigmas: DVec3,
        centers: DVec3,
    },
    /// Children applied in order, each feeding the next.
    Composed { deformations: Vec<Deformation> },
}

impl Deformation {
    /// The identity warp.
    pub fn identity() -> Self {
        Deformation::Rigid {
            displacements: DVec3::ZERO,
        }
    }

    pub fn apply(&self, p: DVec3) -> DVec3 {
        match self {
            Deformation::Rigid { displacements } => p + *displacements,
            Deformation::Linear { strains } => p + strain_tensor(strains) * p,
            Deformation::Sigmoid {
                amplitude,
                center,
                lengthscale,
                direction,
            } => {
                let mut q = p.to_array();
                let i = direction.index();
                q[i] += amplitude / (1.0 + (-(q[i] - center) / lengthscale).exp());
                DVec3::from_array(q)
            }
            Deformation::Gaussian {
                amplitudes,
                sigmas,
                centers,
            } => {
                let r2 = p.distance_squared(*centers);
                let bump = |a: f64, s: f64| a * (-r2 / (2.0 * s * s)).exp();
                p + DVec3::new(
                    bump(amplitudes.x, sigmas.x),
                    bump(amplitudes.y, sigmas.y),
                    bump(amplitudes.z, sigmas.z),
                )
            }
            Deformation::Composed { deformations } => {
                deformations.iter().fold(p, |q, d| d.apply(q))
            }
        }
    }

    /// Check parameters that would make [`apply`](Self::apply) produce NaN.
    pub fn validate(&self) -> LoadResult<()> {
        match self {
            Deformation::Rigid { displacements } => {
                finite_vec("displacements", *displacements)?;
            }
            Deformation::Linear { strains } => {
                for &s in strains {
                    finite("strains", s)?;
                }
            }
            Deformation::Sigmoid {
                amplitude,
                center,
                lengthscale,
                ..
            } => {
                finite("amplitude", *amplitude)?;
                finite("center", *center)?;
                if *lengthscale == 0.0 || !lengthscale.is_finite() {
                    return Err(LoadError::invalid(
                        "lengthscale",
                        format!("must be finite and non-zero, got {}", lengthscale),
                    ));
                }
            }
            Deformation::Gaussian {
                amplitudes,
                sigmas,
                centers,
            } => {
                finite_vec("amplitudes", *amplitudes)?;
                finite_vec("centers", *centers)?;
                for s in sigmas.to_array() {
                    positive("sigmas", s.abs())?;
                }
            }
            Deformation::Composed { deformations } => {
                for d in deformations {
                    d.validate()?;
                }
            }
        }
        Ok(())
    }
}

impl Default for Deformation {
    fn default() -> Self {
        Self::identity()
    }
}

fn finite_vec(field: &'static str, v: DVec3) -> LoadResult<()> {
    for c in v.to_array() {
        finite(field, c)?;
    }
    Ok(())
}

fn strain_tensor(s: &[f64; 6]) -> DMat3 {
    let [xx, yy, zz, yz, xz, xy] = *s;
    DMat3::from_cols(
        DVec3::new(xx, xy, xz),
        DVec3::new(xy, yy, yz),
        DVec3::new(xz, yz, zz),
    )
}
