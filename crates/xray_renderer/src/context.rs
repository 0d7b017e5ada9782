//! Per-render evaluation state.

use std::sync::atomic::{AtomicBool, Ordering};

use xray_core::{Deformation, DensityField, Object};
use xray_math::{DVec3, Interval, Ray};

use crate::integrator::IntegrationMethod;

/// Everything a pixel task needs to turn a ray into an intensity.
///
/// Built fresh for every render call and shared immutably across worker
/// threads. The clipping flags are the only interior mutability.
#[derive(Debug)]
pub struct RenderContext {
    pub object: Object,
    pub deformation: Option<Deformation>,
    pub density_multiplier: f64,
    /// Optical depth added to every ray
    pub flat_field: f64,
    pub method: IntegrationMethod,
    warned_min: AtomicBool,
    warned_max: AtomicBool,
}

impl RenderContext {
    pub fn new(object: Object) -> Self {
        Self {
            object,
            deformation: None,
            density_multiplier: 1.0,
            flat_field: 0.0,
            method: IntegrationMethod::default(),
            warned_min: AtomicBool::new(false),
            warned_max: AtomicBool::new(false),
        }
    }

    pub fn with_deformation(mut self, deformation: Option<Deformation>) -> Self {
        self.deformation = deformation;
        self
    }

    pub fn with_density_multiplier(mut self, multiplier: f64) -> Self {
        self.density_multiplier = multiplier;
        self
    }

    pub fn with_flat_field(mut self, flat_field: f64) -> Self {
        self.flat_field = flat_field;
        self
    }

    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    /// Transmitted intensity `exp(-(flat_field + ∫ρ ds))` along `ray`.
    pub fn transmission(&self, ray: &Ray, ds: f64, window: Interval) -> f64 {
        self.check_clipping(ray, window);
        let depth = self.flat_field + self.method.optical_depth(self, ray, ds, window);
        (-depth).exp()
    }

    /// Warn once per render if the object reaches either end of the window.
    fn check_clipping(&self, ray: &Ray, window: Interval) {
        let warned_min = self.warned_min.load(Ordering::Relaxed);
        let warned_max = self.warned_max.load(Ordering::Relaxed);
        if warned_min && warned_max {
            return;
        }

        let ray = ray.normalized();
        if !warned_min
            && self.density(ray.at(window.min)) > 0.0
            && !self.warned_min.swap(true, Ordering::Relaxed)
        {
            log::warn!("Clipping at smin detected: scan window starts inside the object");
        }
        if !warned_max
            && self.density(ray.at(window.max)) > 0.0
            && !self.warned_max.swap(true, Ordering::Relaxed)
        {
            log::warn!("Clipping at smax detected: scan window ends inside the object");
        }
    }

    /// Whether clipping at (`smin`, `smax`) has been reported.
    pub fn clipping_reported(&self) -> (bool, bool) {
        (
            self.warned_min.load(Ordering::Relaxed),
            self.warned_max.load(Ordering::Relaxed),
        )
    }
}

impl DensityField for RenderContext {
    #[inline]
    fn density(&self, p: DVec3) -> f64 {
        let q = match &self.deformation {
            Some(d) => d.apply(p),
            None => p,
        };
        self.object.density(q) * self.density_multiplier
    }
}
