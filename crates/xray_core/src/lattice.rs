//! Prebuilt lattice unit cells.

use xray_math::{Aabb, DVec3};

use crate::loader::{positive, LoadResult};
use crate::object::{Composite, Object, UnitCell};
use crate::primitive::{Cylinder, Primitive};

/// Strut end points of the Kelvin (tetrakaidecahedron) cell on [0, 1]³.
const KELVIN_STRUTS: [([f64; 3], [f64; 3]); 36] = [
    ([0.25, 0.00, 0.50], [0.50, 0.00, 0.75]),
    ([0.25, 1.00, 0.50], [0.50, 1.00, 0.75]),
    ([0.25, 0.00, 0.50], [0.50, 0.00, 0.25]),
    ([0.25, 1.00, 0.50], [0.50, 1.00, 0.25]),
    ([0.25, 0.00, 0.50], [0.00, 0.25, 0.50]),
    ([0.50, 0.00, 0.75], [0.75, 0.00, 0.50]),
    ([0.50, 1.00, 0.75], [0.75, 1.00, 0.50]),
    ([0.50, 0.00, 0.75], [0.50, 0.25, 1.00]),
    ([0.75, 0.00, 0.50], [0.50, 0.00, 0.25]),
    ([0.75, 1.00, 0.50], [0.50, 1.00, 0.25]),
    ([0.75, 0.00, 0.50], [1.00, 0.25, 0.50]),
    ([0.50, 0.00, 0.25], [0.50, 0.25, 0.00]),
    ([1.00, 0.50, 0.75], [0.75, 0.50, 1.00]),
    ([1.00, 0.75, 0.50], [0.75, 1.00, 0.50]),
    ([1.00, 0.50, 0.25], [0.75, 0.50, 0.00]),
    ([0.25, 1.00, 0.50], [0.00, 0.75, 0.50]),
    ([0.50, 1.00, 0.75], [0.50, 0.75, 1.00]),
    ([0.50, 1.00, 0.25], [0.50, 0.75, 0.00]),
    ([0.00, 0.25, 0.50], [0.00, 0.50, 0.75]),
    ([1.00, 0.25, 0.50], [1.00, 0.50, 0.75]),
    ([0.00, 0.25, 0.50], [0.00, 0.50, 0.25]),
    ([1.00, 0.25, 0.50], [1.00, 0.50, 0.25]),
    ([0.00, 0.50, 0.75], [0.25, 0.50, 1.00]),
    ([0.00, 0.50, 0.75], [0.00, 0.75, 0.50]),
    ([1.00, 0.50, 0.75], [1.00, 0.75, 0.50]),
    ([0.00, 0.75, 0.50], [0.00, 0.50, 0.25]),
    ([1.00, 0.75, 0.50], [1.00, 0.50, 0.25]),
    ([0.00, 0.50, 0.25], [0.25, 0.50, 0.00]),
    ([0.25, 0.50, 0.00], [0.50, 0.75, 0.00]),
    ([0.25, 0.50, 1.00], [0.50, 0.75, 1.00]),
    ([0.25, 0.50, 0.00], [0.50, 0.25, 0.00]),
    ([0.25, 0.50, 1.00], [0.50, 0.25, 1.00]),
    ([0.50, 0.75, 0.00], [0.75, 0.50, 0.00]),
    ([0.50, 0.75, 1.00], [0.75, 0.50, 1.00]),
    ([0.75, 0.50, 0.00], [0.50, 0.25, 0.00]),
    ([0.75, 0.50, 1.00], [0.50, 0.25, 1.00]),
];

impl UnitCell {
    /// Kelvin foam cell of unit density struts, spanning `[0, scale]³`.
    ///
    /// Struts on the faces are shared with the neighbouring cell once the
    /// result is tessellated.
    pub fn kelvin(radius: f64, scale: f64) -> LoadResult<Self> {
        positive("scale", scale)?;
        let struts = KELVIN_STRUTS
            .iter()
            .map(|(a, b)| {
                let p0 = DVec3::from_array(*a) * scale;
                let p1 = DVec3::from_array(*b) * scale;
                Cylinder::new(p0, p1, radius, 1.0).map(|c| Object::Primitive(Primitive::Cylinder(c)))
            })
            .collect::<LoadResult<Vec<_>>>()?;

        let bounds = Aabb::from_points(DVec3::ZERO, DVec3::splat(scale));
        Ok(UnitCell::new(Composite::new(struts, true)?, bounds))
    }
}
