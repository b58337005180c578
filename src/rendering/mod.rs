pub mod cell;

// Re-export specific items to keep the API clean for the rest of the crate
pub use cell::{cell_segments, cell_vertices, CELL_EDGES};
