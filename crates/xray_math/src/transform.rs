// Transform utilities for DMat4
//
// glam already provides transform_point3() and inverse(); pose manifests want
// the row-major layout, which glam doesn't export directly.

use glam::DMat4;

/// Extension trait for DMat4.
pub trait Mat4Ext {
    /// Rows of the matrix, outer index = row.
    ///
    /// glam stores columns, pose files store rows.
    fn to_rows(&self) -> [[f64; 4]; 4];
}

impl Mat4Ext for DMat4 {
    fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            *row = self.row(i).to_array();
        }
        rows
    }
}
