// src/rendering/cell.rs

use crate::utils::linalg::frac_to_cart;

/// Corner order: origin, a, b, c, a+b, a+c, b+c, a+b+c.
const CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// The twelve parallelepiped edges, as indices into [`cell_vertices`].
pub const CELL_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (0, 2),
    (0, 3),
    (1, 4),
    (1, 5),
    (2, 4),
    (2, 6),
    (3, 5),
    (3, 6),
    (4, 7),
    (5, 7),
    (6, 7),
];

pub fn cell_vertices(lattice: [[f64; 3]; 3]) -> [[f64; 3]; 8] {
    CORNERS.map(|frac| frac_to_cart(frac, lattice))
}

/// Start/end points of every cell edge, in [`CELL_EDGES`] order.
pub fn cell_segments(lattice: [[f64; 3]; 3]) -> Vec<([f64; 3], [f64; 3])> {
    let verts = cell_vertices(lattice);
    CELL_EDGES
        .iter()
        .map(|&(i, j)| (verts[i], verts[j]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRICLINIC: [[f64; 3]; 3] = [[3.0, 0.2, 0.0], [0.5, 4.0, 0.1], [0.3, 0.7, 5.0]];

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        (0..3).all(|k| (a[k] - b[k]).abs() < 1e-12)
    }

    #[test]
    fn test_origin_and_far_corner() {
        let v = cell_vertices(TRICLINIC);
        assert!(close(v[0], [0.0, 0.0, 0.0]));
        assert!(close(v[7], [3.8, 4.9, 5.1]));
    }

    #[test]
    fn test_single_and_pair_corners() {
        let [a, b, c] = TRICLINIC;
        let v = cell_vertices(TRICLINIC);
        assert!(close(v[1], a));
        assert!(close(v[2], b));
        assert!(close(v[3], c));
        assert!(close(v[4], [a[0] + b[0], a[1] + b[1], a[2] + b[2]]));
        assert!(close(v[5], [a[0] + c[0], a[1] + c[1], a[2] + c[2]]));
        assert!(close(v[6], [b[0] + c[0], b[1] + c[1], b[2] + c[2]]));
    }

    #[test]
    fn test_edges_cover_every_corner_three_times() {
        let mut degree = [0; 8];
        for &(i, j) in CELL_EDGES.iter() {
            assert_ne!(i, j);
            degree[i] += 1;
            degree[j] += 1;
        }
        assert_eq!(degree, [3; 8]);
    }

    #[test]
    fn test_edges_run_along_one_lattice_vector() {
        // Every edge of a unit cube has length 1
        let cube = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let segments = cell_segments(cube);
        assert_eq!(segments.len(), 12);
        for (s, e) in segments {
            let d: f64 = (0..3).map(|k| (e[k] - s[k]).powi(2)).sum();
            assert!((d - 1.0).abs() < 1e-12);
        }
    }
}
