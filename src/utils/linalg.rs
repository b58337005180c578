// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};

/// Lattice rows [[ax, ay, az], [bx, by, bz], [cx, cy, cz]] as a matrix
/// whose columns are a, b, c.
pub fn basis_matrix(lattice: [[f64; 3]; 3]) -> Matrix3<f64> {
  Matrix3::from_columns(&[
    Vector3::from(lattice[0]),
    Vector3::from(lattice[1]),
    Vector3::from(lattice[2]),
  ])
}

/// Convert fractional coordinates to Cartesian using lattice matrix
///
/// ```text
/// Cartesian = f_a * a + f_b * b + f_c * c
/// ```
pub fn frac_to_cart(frac: [f64; 3], lattice: [[f64; 3]; 3]) -> [f64; 3] {
  let cart = basis_matrix(lattice) * Vector3::from(frac);
  [cart.x, cart.y, cart.z]
}
